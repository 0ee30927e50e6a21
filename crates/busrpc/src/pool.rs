//! # Endpoint Pool
//!
//! Caches one live proxy per `Target`. Every call with the same target shares
//! the same `Endpoint` until a retry asks for a fresh one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use buspack::Value;
use tracing::debug;
use tracing::warn;

use crate::bus;
use crate::bus::Bus;
use crate::bus::BusError;
use crate::bus::Remote;
use crate::bus::SignalSink;
use crate::bus::Target;
use crate::call::lock;

/// How `EndpointPool::for_target` treats a cached endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Reuse the cached endpoint if it is valid; create one otherwise.
    UseExisting,
    /// Always create a new endpoint, replacing the cached one.
    Recreate,
}

/// A proxy to one target, or the record of a failed attempt to create one.
pub struct Endpoint {
    target: Target,
    remote: Option<Arc<dyn Remote>>,
    serial: u64,
}

impl Endpoint {
    pub fn is_valid(&self) -> bool {
        self.remote.is_some()
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Pool-issued number telling endpoint instances apart.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn invoke(&self, method: &str, args: &[Value]) -> bus::Result<Vec<Value>> {
        match &self.remote {
            Some(remote) => remote.invoke(method, args),
            None => Err(BusError::disconnected(format!("no proxy for {}", self.target))),
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("target", &self.target)
            .field("serial", &self.serial)
            .field("valid", &self.is_valid())
            .finish()
    }
}

pub(crate) struct EndpointPool {
    bus: Arc<dyn Bus>,
    sink: SignalSink,
    endpoints: Mutex<HashMap<Target, Arc<Endpoint>>>,
    next_serial: AtomicU64,
    shut_down: AtomicBool,
}

impl EndpointPool {
    pub fn new(bus: Arc<dyn Bus>, sink: SignalSink) -> Self {
        Self {
            bus,
            sink,
            endpoints: Mutex::new(HashMap::new()),
            next_serial: AtomicU64::new(1),
            shut_down: AtomicBool::new(false),
        }
    }

    fn serial(&self) -> u64 {
        self.next_serial.fetch_add(1, Ordering::Relaxed)
    }

    pub fn for_target(&self, target: &Target, policy: Policy) -> Arc<Endpoint> {
        if self.shut_down.load(Ordering::Acquire) {
            warn!("Endpoint pool is shut down; no endpoint for {}", target);
            return Arc::new(Endpoint {
                target: target.clone(),
                remote: None,
                serial: self.serial(),
            });
        }

        let mut endpoints = lock(&self.endpoints);
        if policy == Policy::UseExisting {
            if let Some(existing) = endpoints.get(target) {
                if existing.is_valid() {
                    return Arc::clone(existing);
                }
            }
        }

        let endpoint = Arc::new(self.create(target));
        endpoints.insert(target.clone(), Arc::clone(&endpoint));
        endpoint
    }

    fn create(&self, target: &Target) -> Endpoint {
        let serial = self.serial();
        let remote = match self.bus.connect(target, self.sink.clone()) {
            Ok(remote) => {
                debug!("Created endpoint #{} for {}", serial, target);
                Some(remote)
            }
            Err(e) => {
                warn!("Failed to create endpoint for {}: {}", target, e);
                None
            }
        };
        Endpoint {
            target: target.clone(),
            remote,
            serial,
        }
    }

    /// Drops every cached endpoint. Idempotent.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        lock(&self.endpoints).clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.endpoints).len()
    }
}
