//! # Call Descriptors
//!
//! A `Call` is the shape of one remote method invocation: its target, its
//! method name and an ordered list of typed parameter slots. It is declared
//! once through a `CallBuilder` and then invoked any number of times.
//!
//! ```ignore
//! let mut builder = client.call(Target::from_name("org.example.Net1"), "Lookup");
//! let host = builder.input::<Str>("host", "localhost".into());
//! let addr = builder.output::<Str>("addr");
//! let call = builder.build();
//!
//! if call.call_sync() {
//!     println!("{}", call.get(addr));
//! }
//! ```
//!
//! ## Invariants
//!
//! - Every slot belongs to exactly one call. A `Param` carries the `CallId` of
//!   the builder that issued it; using it with any other call is logged and
//!   has no effect.
//! - Inputs are encoded from the slot's value at the moment of the call, not
//!   at declaration.
//! - Outputs are reset to their default whenever an invocation fails.
//! - Parameter names are unique within a call. A repeated name gets a slot,
//!   but the slot takes no part in marshalling.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use buspack::Value;
use buspack::names;
use tracing::debug;
use tracing::error;

use crate::bus::Target;
use crate::client::Client;
use crate::dispatch;
use crate::shadow::ShadowStore;
use crate::wire::Decode;
use crate::wire::Encode;
use crate::wire::WireType;

/// Strong type for call identifiers. Issued by the client, never reused.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CallId(pub u64);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

/// Direction marker for input slots.
#[derive(Debug, Clone, Copy)]
pub struct In;

/// Direction marker for output slots.
#[derive(Debug, Clone, Copy)]
pub struct Out;

/// A typed reference to one slot of one call.
pub struct Param<W, D> {
    call: CallId,
    slot: usize,
    _marker: PhantomData<fn() -> (W, D)>,
}

impl<W, D> Param<W, D> {
    /// The call this slot belongs to.
    pub fn call(&self) -> CallId {
        self.call
    }
}

impl<W, D> Clone for Param<W, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<W, D> Copy for Param<W, D> {}

impl<W: WireType, D> fmt::Debug for Param<W, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Param({}#{} '{}')", self.call, self.slot, W::SIGNATURE)
    }
}

/// Locks a slot, ignoring poison. A panicking user callback must not make a
/// call unusable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

type Cell = Arc<dyn Any + Send + Sync>;

pub(crate) struct InputBinding {
    pub name: String,
    pub signature: &'static str,
    pub encode: Box<dyn Fn() -> Option<Value> + Send + Sync>,
}

pub(crate) struct OutputBinding {
    pub name: String,
    pub signature: &'static str,
    pub decode: Box<dyn Fn(&Value, &Arc<ShadowStore>) -> bool + Send + Sync>,
    pub reset: Box<dyn Fn() + Send + Sync>,
}

/// The frozen shape of a call, as held by the registry.
pub(crate) struct CallData {
    pub id: CallId,
    pub target: Target,
    pub method: String,
    /// Outcome of the naming check at build time. An `Err` call is never
    /// invoked.
    pub naming: buspack::Result<()>,
    pub inputs: Vec<InputBinding>,
    pub outputs: Vec<OutputBinding>,
}

impl CallData {
    pub fn reset_outputs(&self) {
        for output in &self.outputs {
            (output.reset)();
        }
    }
}

/// Collects the slots of a call. Obtained from `Client::call`.
pub struct CallBuilder {
    client: Client,
    id: CallId,
    target: Target,
    method: String,
    names: HashSet<String>,
    cells: Vec<Cell>,
    inputs: Vec<InputBinding>,
    outputs: Vec<OutputBinding>,
}

impl CallBuilder {
    pub(crate) fn new(client: Client, id: CallId, target: Target, method: String) -> Self {
        Self {
            client,
            id,
            target,
            method,
            names: HashSet::new(),
            cells: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    /// Allocates a slot and reports whether `name` is still free.
    fn slot<W: WireType, D>(&mut self, name: &str, initial: W::Native) -> (Param<W, D>, Arc<Mutex<W::Native>>, bool) {
        let cell = Arc::new(Mutex::new(initial));
        let param = Param {
            call: self.id,
            slot: self.cells.len(),
            _marker: PhantomData,
        };
        self.cells.push(cell.clone());

        let fresh = self.names.insert(name.to_string());
        if !fresh {
            error!(
                "Parameter '{}' declared twice in {} ({}.{}); the second slot is not marshalled",
                name, self.id, self.target.interface, self.method
            );
        }
        (param, cell, fresh)
    }

    /// Declares the next input.
    pub fn input<W: Encode>(&mut self, name: &str, initial: W::Native) -> Param<W, In> {
        let (param, cell, fresh) = self.slot::<W, In>(name, initial);
        if fresh {
            self.inputs.push(InputBinding {
                name: name.to_string(),
                signature: W::SIGNATURE,
                encode: Box::new(move || W::encode(&lock(&cell))),
            });
        }
        param
    }

    /// Declares the next output, starting out at its default.
    pub fn output<W: Decode>(&mut self, name: &str) -> Param<W, Out> {
        self.output_with::<W>(name, W::Native::default())
    }

    /// Declares the next output with an initial value. The value is visible
    /// until the first invocation, which either overwrites or resets it.
    pub fn output_with<W: Decode>(&mut self, name: &str, initial: W::Native) -> Param<W, Out> {
        let (param, cell, fresh) = self.slot::<W, Out>(name, initial);
        if fresh {
            let decode_cell = cell.clone();
            self.outputs.push(OutputBinding {
                name: name.to_string(),
                signature: W::SIGNATURE,
                decode: Box::new(move |value: &Value, store: &Arc<ShadowStore>| match W::decode(value, store) {
                    Some(native) => {
                        *lock(&decode_cell) = native;
                        true
                    }
                    None => false,
                }),
                reset: Box::new(move || *lock(&cell) = W::Native::default()),
            });
        }
        param
    }

    /// Freezes the shape and registers the call with the client.
    ///
    /// Target and method names are checked here, once. A call that fails the
    /// check is still returned, but every invocation of it fails without
    /// touching the bus.
    pub fn build(self) -> Call {
        let naming = self
            .target
            .validate()
            .and_then(|_| names::validate_member_name(&self.method));
        if let Err(problem) = &naming {
            error!("{} targets {}.{}: {}", self.id, self.target, self.method, problem);
        }

        let data = CallData {
            id: self.id,
            target: self.target.clone(),
            method: self.method.clone(),
            naming,
            inputs: self.inputs,
            outputs: self.outputs,
        };
        self.client.inner.registry.register(self.id, Arc::new(data));
        debug!("Registered {} for {}.{}", self.id, self.target, self.method);

        Call {
            id: self.id,
            client: self.client,
            target: self.target,
            method: self.method,
            cells: self.cells,
        }
    }
}

/// A registered call. Dropping it removes it from the registry.
pub struct Call {
    id: CallId,
    client: Client,
    target: Target,
    method: String,
    cells: Vec<Cell>,
}

impl Call {
    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    fn cell<W: WireType, D>(&self, param: Param<W, D>) -> Option<&Mutex<W::Native>> {
        if param.call != self.id {
            error!(
                "Parameter of {} used with {} ({}.{}); ignored",
                param.call, self.id, self.target.interface, self.method
            );
            return None;
        }
        self.cells.get(param.slot)?.as_ref().downcast_ref::<Mutex<W::Native>>()
    }

    /// Assigns a slot. Inputs are sent with the next invocation.
    pub fn set<W: WireType, D>(&self, param: Param<W, D>, value: W::Native) {
        if let Some(cell) = self.cell(param) {
            *lock(cell) = value;
        }
    }

    /// Reads a copy of a slot.
    pub fn get<W: WireType, D>(&self, param: Param<W, D>) -> W::Native {
        self.with(param, Clone::clone)
    }

    /// Moves a slot's value out, leaving the default behind.
    pub fn take<W: WireType, D>(&self, param: Param<W, D>) -> W::Native {
        match self.cell(param) {
            Some(cell) => std::mem::take(&mut *lock(cell)),
            None => W::Native::default(),
        }
    }

    /// Borrows a slot. A foreign `Param` sees the default value.
    pub fn with<W: WireType, D, R>(&self, param: Param<W, D>, f: impl FnOnce(&W::Native) -> R) -> R {
        match self.cell(param) {
            Some(cell) => f(&lock(cell)),
            None => f(&W::Native::default()),
        }
    }

    /// Invokes the call and blocks until it completes.
    ///
    /// Returns whether the call succeeded. Reasons for failure are logged.
    /// On failure every output holds its default value.
    pub fn call_sync(&self) -> bool {
        dispatch::call_sync(&self.client.inner, self.id)
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("method", &self.method)
            .field("slots", &self.cells.len())
            .finish()
    }
}

impl Drop for Call {
    fn drop(&mut self) {
        self.client.inner.registry.release(self.id);
    }
}
