//! # Client
//!
//! The owned context every call goes through: one bus, one registry, one
//! endpoint pool, one shadow store and one signal loop. Independent clients
//! share nothing.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use buspack::names;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::bus::Bus;
use crate::bus::Signal;
use crate::bus::Target;
use crate::call::CallBuilder;
use crate::call::CallId;
use crate::config::ClientConfig;
use crate::pool::Endpoint;
use crate::pool::EndpointPool;
use crate::pool::Policy;
use crate::registry::CallRegistry;
use crate::shadow::ShadowStore;
use crate::signal::SignalHub;

pub(crate) struct ClientInner {
    pub config: ClientConfig,
    pub registry: CallRegistry,
    pub pool: EndpointPool,
    pub signals: SignalHub,
    pub shadow: Arc<ShadowStore>,
    next_call_id: AtomicU64,
}

/// A handle to a client context. Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

impl Client {
    pub fn new(bus: Arc<dyn Bus>) -> Self {
        Self::with_config(bus, ClientConfig::default())
    }

    pub fn with_config(bus: Arc<dyn Bus>, config: ClientConfig) -> Self {
        let signals = SignalHub::new();
        let pool = EndpointPool::new(bus, signals.sink());
        Self {
            inner: Arc::new(ClientInner {
                config,
                registry: CallRegistry::new(),
                pool,
                signals,
                shadow: Arc::new(ShadowStore::new()),
                next_call_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Starts declaring a call to `method` on `target`.
    pub fn call(&self, target: Target, method: impl Into<String>) -> CallBuilder {
        let id = CallId(self.inner.next_call_id.fetch_add(1, Ordering::Relaxed));
        CallBuilder::new(self.clone(), id, target, method.into())
    }

    /// The store backing every handle this client decodes.
    pub fn shadow(&self) -> &Arc<ShadowStore> {
        &self.inner.shadow
    }

    /// Looks up or creates the pooled endpoint for `target`.
    pub fn endpoint(&self, target: &Target, policy: Policy) -> Arc<Endpoint> {
        self.inner.pool.for_target(target, policy)
    }

    pub fn pooled_endpoints(&self) -> usize {
        self.inner.pool.len()
    }

    /// Number of calls currently registered.
    pub fn live_calls(&self) -> usize {
        self.inner.registry.len()
    }

    /// How many times a call was caught being invoked from two threads at once.
    pub fn contract_violations(&self) -> u64 {
        self.inner.registry.violations()
    }

    /// Registers `callback` for `signal` emitted by `target`.
    ///
    /// Also makes sure an endpoint for `target` exists, so that the bus starts
    /// delivering its signals. Returns whether that endpoint is valid; the
    /// callback is registered either way.
    pub fn register_signal<F>(&self, target: &Target, signal: &str, callback: F) -> bool
    where
        F: Fn(&Signal) + Send + Sync + 'static,
    {
        if let Err(e) = names::validate_member_name(signal) {
            error!("Cannot register signal on {}: {}", target, e);
            return false;
        }
        self.inner.signals.table.add(&target.name, signal, Arc::new(callback));
        debug!("Registered callback for {} from {}", signal, target.name);

        let valid = self.inner.pool.for_target(target, Policy::UseExisting).is_valid();
        if !valid {
            warn!("Registered {} from {}, but the endpoint is invalid", signal, target);
        }
        valid
    }

    /// Like `register_signal`, with the target derived by `Target::from_name`.
    pub fn register_signal_by_name<F>(&self, name: &str, signal: &str, callback: F) -> bool
    where
        F: Fn(&Signal) + Send + Sync + 'static,
    {
        self.register_signal(&Target::from_name(name), signal, callback)
    }

    /// Runs the signal loop on this thread. See `SignalHub::wait`.
    pub fn wait_signals(&self, timeout: Option<Duration>) -> bool {
        self.inner.signals.wait(timeout)
    }

    pub fn stop_signals(&self) {
        self.inner.signals.stop();
    }

    /// Whether a signal loop exists, i.e. `wait_signals` ran since the last stop.
    pub fn signals_running(&self) -> bool {
        self.inner.signals.is_running()
    }

    /// Tears the client down. Idempotent.
    ///
    /// Afterwards every call fails, registry operations are no-ops and the
    /// pool hands out only invalid endpoints.
    pub fn shutdown(&self) {
        if self.is_shut_down() {
            return;
        }
        self.inner.registry.shutdown();
        self.inner.pool.shutdown();
        self.inner.signals.stop();
        debug!("Client shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.registry.is_shut_down()
    }
}
