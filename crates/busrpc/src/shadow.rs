//! # Shadow Value Store
//!
//! Lets a dynamic value be carried around by a small token instead of by
//! value. The store owns every value; a `Handle` only knows its id.
//!
//! ## Invariants
//!
//! - Ids are issued by the store and never reused.
//! - Cloning a `Handle` registers the same `Arc<Value>` under a fresh id, so
//!   copies share the value and outlive the original independently.
//! - Dropping a `Handle` erases its entry. Looking up an erased id yields
//!   `None`, never a stale value.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use buspack::Value;
use dashmap::DashMap;

/// Strong type for shadow value identifiers.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle-{}", self.0)
    }
}

/// Side table of dynamic values keyed by handle id.
#[derive(Debug)]
pub struct ShadowStore {
    values: DashMap<HandleId, Arc<Value>>,
    next_id: AtomicU64,
}

impl Default for ShadowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ShadowStore {
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> HandleId {
        HandleId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Stores a value and returns the handle that owns the entry.
    pub fn insert(self: &Arc<Self>, value: impl Into<Arc<Value>>) -> Handle {
        let id = self.next_id();
        self.values.insert(id, value.into());
        Handle {
            store: Arc::clone(self),
            id,
        }
    }

    pub fn lookup(&self, id: HandleId) -> Option<Arc<Value>> {
        self.values.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn erase(&self, id: HandleId) {
        self.values.remove(&id);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A token denoting one value in a `ShadowStore`.
pub struct Handle {
    store: Arc<ShadowStore>,
    id: HandleId,
}

impl Handle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// The denoted value, or `None` if the entry is gone.
    pub fn value(&self) -> Option<Arc<Value>> {
        self.store.lookup(self.id)
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.value()?.as_i32()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value()?.as_bool()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value()?.as_f64()
    }

    pub fn as_str(&self) -> Option<String> {
        self.value()?.as_str().map(str::to_string)
    }

    /// Printed form of a variant's body.
    pub fn variant_text(&self) -> Option<String> {
        self.value()?.as_variant().map(buspack::print::print)
    }

    /// Printed form of the value.
    pub fn print(&self) -> Option<String> {
        self.value().map(|v| buspack::print::print(&v))
    }
}

impl Clone for Handle {
    fn clone(&self) -> Self {
        match self.store.lookup(self.id) {
            Some(value) => self.store.insert(value),
            // erased stays erased, but the copy still owns a distinct id
            None => Handle {
                store: Arc::clone(&self.store),
                id: self.store.next_id(),
            },
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.store.erase(self.id);
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(v) => write!(f, "Handle({}, {})", self.id, v),
            None => write!(f, "Handle({}, <none>)", self.id),
        }
    }
}
