//! # Bus Abstraction
//!
//! The two operations the call layer needs from a message bus: open a proxy
//! to a remote object, and invoke a method on it.
//!
//! ## Philosophy
//!
//! - **Value-Oriented**: A bus moves `buspack::Value` tuples. It knows nothing
//!   about typed parameters, call descriptors or the shadow store.
//! - **Blocking**: `invoke` returns when the reply arrives. Calls are synchronous
//!   from the caller's perspective; the bus may do whatever it likes inside.
//! - **Classified Failures**: Every failure carries an `ErrorKind` so that the
//!   dispatcher can decide between retrying and giving up.

use std::fmt;
use std::sync::Arc;

use buspack::Value;
use buspack::names;
use tokio::sync::mpsc;

/// The remote object a call or signal subscription talks to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub name: String,
    pub path: String,
    pub interface: String,
}

impl Target {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        interface: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            interface: interface.into(),
        }
    }

    /// Derives path and interface from a bus name.
    ///
    /// `org.freedesktop.resolve1` becomes path `/org/freedesktop/resolve1`
    /// with interface `org.freedesktop.resolve1`.
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let path = format!("/{}", name.replace('.', "/"));
        Self {
            interface: name.clone(),
            path,
            name,
        }
    }

    /// Checks all three parts against the bus naming rules.
    pub fn validate(&self) -> buspack::Result<()> {
        names::validate_bus_name(&self.name)?;
        names::validate_object_path(&self.path)?;
        names::validate_interface_name(&self.interface)?;
        Ok(())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.path, self.interface)
    }
}

/// How a bus failure came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Nobody owns the requested name on the bus (yet).
    ServiceUnknown,
    /// The connection to the bus went away.
    Disconnected,
    /// The bus policy refused the call.
    AccessDenied,
    /// Anything else, including errors raised by the remote method.
    Unspecified,
}

/// A failure reported by the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusError {
    pub kind: ErrorKind,
    pub message: String,
}

impl BusError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn service_unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnknown, message)
    }

    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Disconnected, message)
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessDenied, message)
    }

    pub fn unspecified(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unspecified, message)
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::ServiceUnknown => write!(f, "Service unknown: {}", self.message),
            ErrorKind::Disconnected => write!(f, "Disconnected: {}", self.message),
            ErrorKind::AccessDenied => write!(f, "Access denied: {}", self.message),
            ErrorKind::Unspecified => write!(f, "Bus error: {}", self.message),
        }
    }
}

impl std::error::Error for BusError {}

impl From<buspack::Error> for BusError {
    fn from(e: buspack::Error) -> Self {
        Self::unspecified(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BusError>;

/// What the dispatcher does after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// No error; the first attempt, or a success.
    None,
    /// Transient; back off and try again on a fresh endpoint.
    Retriable,
    /// Give up.
    Fatal,
}

impl ErrorClass {
    pub fn of(error: Option<&BusError>) -> Self {
        match error.map(|e| e.kind) {
            None => ErrorClass::None,
            Some(ErrorKind::ServiceUnknown | ErrorKind::Disconnected) => ErrorClass::Retriable,
            Some(_) => ErrorClass::Fatal,
        }
    }
}

/// A notification broadcast by a remote object.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub sender: String,
    pub path: String,
    pub interface: String,
    pub name: String,
    pub args: Vec<Value>,
}

/// Where a bus delivers signals for the endpoints it created.
///
/// Signals are queued and only dispatched while some thread is inside
/// `Client::wait_signals`.
#[derive(Debug, Clone)]
pub struct SignalSink {
    tx: mpsc::UnboundedSender<Signal>,
}

impl SignalSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Signal>) -> Self {
        Self { tx }
    }

    /// Queues a signal. Returns false once the owning client is gone.
    pub fn emit(&self, signal: Signal) -> bool {
        self.tx.send(signal).is_ok()
    }

    /// Whether both sinks feed the same client.
    pub fn same_client(&self, other: &SignalSink) -> bool {
        self.tx.same_channel(&other.tx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A live proxy to one remote object.
///
/// This trait is designed to be object-safe (`Arc<dyn Remote>`).
pub trait Remote: Send + Sync {
    /// Invokes `method` with `args` and blocks until the reply arrives.
    ///
    /// # Invariants
    /// - Must return the reply tuple in wire order.
    /// - Must not interpret the arguments beyond what the remote side requires.
    fn invoke(&self, method: &str, args: &[Value]) -> Result<Vec<Value>>;
}

/// A message bus the client connects through.
pub trait Bus: Send + Sync + 'static {
    /// Creates a proxy for `target`.
    ///
    /// Signals emitted by `target` are delivered to `signals` for as long as
    /// the bus keeps the subscription alive.
    fn connect(&self, target: &Target, signals: SignalSink) -> Result<Arc<dyn Remote>>;
}
