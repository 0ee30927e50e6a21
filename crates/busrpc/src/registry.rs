//! # Call Registry
//!
//! Tracks the live calls of one client by id, so that the dispatcher can find
//! a call's frozen shape without borrowing the `Call` itself.
//!
//! ## Invariants
//!
//! - While a `CallGuard` is outstanding there are exactly two strong
//!   references to the call's data: the registry's entry and the guard.
//!   Any other count means two threads are invoking one call at once. That is
//!   a contract violation; it is logged and counted, and the invocation
//!   proceeds anyway.
//! - After `shutdown` every operation is a no-op that logs a warning.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use tracing::error;
use tracing::warn;

use crate::call::CallData;
use crate::call::CallId;

const OWNERS_WHILE_ACQUIRED: usize = 2;

pub(crate) struct CallRegistry {
    calls: DashMap<CallId, Arc<CallData>>,
    shut_down: AtomicBool,
    violations: AtomicU64,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self {
            calls: DashMap::new(),
            shut_down: AtomicBool::new(false),
            violations: AtomicU64::new(0),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    pub fn register(&self, id: CallId, data: Arc<CallData>) {
        if self.is_shut_down() {
            warn!("Registry is shut down; {} not registered", id);
            return;
        }
        if self.calls.insert(id, data).is_some() {
            error!("{} registered twice; previous shape replaced", id);
        }
    }

    /// Looks a call up for one invocation.
    ///
    /// Returns an empty guard if the call is unknown or the registry is shut down.
    pub fn acquire(&self, id: CallId) -> CallGuard<'_> {
        if self.is_shut_down() {
            warn!("Registry is shut down; {} not acquired", id);
            return CallGuard { registry: self, id, data: None };
        }
        let Some(data) = self.calls.get(&id).map(|entry| Arc::clone(entry.value())) else {
            error!("{} is not registered", id);
            return CallGuard { registry: self, id, data: None };
        };
        self.check_owners(id, &data, "acquire");
        CallGuard { registry: self, id, data: Some(data) }
    }

    pub fn release(&self, id: CallId) {
        if self.is_shut_down() {
            warn!("Registry is shut down; {} not released", id);
            return;
        }
        self.calls.remove(&id);
    }

    /// Drops every entry. Idempotent.
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            self.calls.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn violations(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }

    fn check_owners(&self, id: CallId, data: &Arc<CallData>, when: &str) {
        let owners = Arc::strong_count(data);
        if owners != OWNERS_WHILE_ACQUIRED {
            self.violations.fetch_add(1, Ordering::Relaxed);
            error!(
                "{} has {} owners at {}, expected {}; is it being invoked from two threads?",
                id, owners, when, OWNERS_WHILE_ACQUIRED
            );
        }
    }
}

/// Shared access to one call's data for the duration of an invocation.
pub(crate) struct CallGuard<'a> {
    registry: &'a CallRegistry,
    id: CallId,
    data: Option<Arc<CallData>>,
}

impl CallGuard<'_> {
    pub fn data(&self) -> Option<&CallData> {
        self.data.as_deref()
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if let Some(data) = &self.data {
            if !self.registry.is_shut_down() {
                self.registry.check_owners(self.id, data, "release");
            }
        }
    }
}
