//! # Local Bus
//!
//! An in-process `Bus`. Services are closures registered under a bus name;
//! signals are pushed by hand with `emit`. Used by the test suite and handy
//! for demos; it never touches a real bus daemon.
//!
//! - Connecting always succeeds unless a failure was injected with
//!   `fail_connect`. Like a real bus, a proxy to a name nobody owns is fine.
//! - Invoking a method on a name nobody owns fails with `ServiceUnknown`.
//! - A signal reaches every client holding an endpoint for the exact
//!   `(name, path, interface)` it was emitted from, once per client.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use buspack::Value;
use dashmap::DashMap;
use tracing::trace;

use crate::bus;
use crate::bus::Bus;
use crate::bus::BusError;
use crate::bus::Remote;
use crate::bus::Signal;
use crate::bus::SignalSink;
use crate::bus::Target;
use crate::call::lock;

/// Method handler of a local service: `(method, args) -> reply`.
pub type Handler = Arc<dyn Fn(&str, &[Value]) -> bus::Result<Vec<Value>> + Send + Sync>;

#[derive(Default)]
struct Shared {
    services: DashMap<String, Handler>,
    connect_failures: DashMap<String, BusError>,
    subscribers: Mutex<Vec<(Target, SignalSink)>>,
    connects: AtomicUsize,
    invocations: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct LocalBus {
    shared: Arc<Shared>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts serving `name`, replacing any previous handler.
    pub fn serve<F>(&self, name: &str, handler: F)
    where
        F: Fn(&str, &[Value]) -> bus::Result<Vec<Value>> + Send + Sync + 'static,
    {
        self.shared.services.insert(name.to_string(), Arc::new(handler));
    }

    /// Stops serving `name`. Later invocations fail with `ServiceUnknown`.
    pub fn remove(&self, name: &str) {
        self.shared.services.remove(name);
    }

    /// Makes every `connect` to `name` fail with `error`, or heals it with `None`.
    pub fn fail_connect(&self, name: &str, error: Option<BusError>) {
        match error {
            Some(e) => {
                self.shared.connect_failures.insert(name.to_string(), e);
            }
            None => {
                self.shared.connect_failures.remove(name);
            }
        }
    }

    /// Broadcasts a signal. Returns how many clients it was queued for.
    pub fn emit(&self, signal: Signal) -> usize {
        let mut subscribers = lock(&self.shared.subscribers);
        subscribers.retain(|(_, sink)| !sink.is_closed());

        let mut delivered = 0;
        for (target, sink) in subscribers.iter() {
            let matches = target.name == signal.sender
                && target.path == signal.path
                && target.interface == signal.interface;
            if matches && sink.emit(signal.clone()) {
                delivered += 1;
            }
        }
        trace!("Emitted {} from {} to {} clients", signal.name, signal.sender, delivered);
        delivered
    }

    /// Total successful and failed `connect` calls.
    pub fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    /// Total `invoke` calls, including failed ones.
    pub fn invocations(&self) -> usize {
        self.shared.invocations.load(Ordering::SeqCst)
    }
}

impl Bus for LocalBus {
    fn connect(&self, target: &Target, signals: SignalSink) -> bus::Result<Arc<dyn Remote>> {
        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.shared.connect_failures.get(&target.name) {
            return Err(error.value().clone());
        }

        let mut subscribers = lock(&self.shared.subscribers);
        let known = subscribers
            .iter()
            .any(|(t, sink)| t == target && sink.same_client(&signals));
        if !known {
            subscribers.push((target.clone(), signals));
        }

        Ok(Arc::new(LocalRemote {
            shared: Arc::clone(&self.shared),
            name: target.name.clone(),
        }))
    }
}

struct LocalRemote {
    shared: Arc<Shared>,
    name: String,
}

impl Remote for LocalRemote {
    fn invoke(&self, method: &str, args: &[Value]) -> bus::Result<Vec<Value>> {
        self.shared.invocations.fetch_add(1, Ordering::SeqCst);
        // handlers may block; never call them under the shard lock
        let handler = self
            .shared
            .services
            .get(&self.name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BusError::service_unknown(format!("{} is not on the bus", self.name)))?;
        handler(method, args)
    }
}
