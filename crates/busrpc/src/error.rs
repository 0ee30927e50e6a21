//! # Error Definitions
//!
//! Failures inside one invocation. None of these reach the caller of
//! `Call::call_sync`, which only learns success or failure; they exist so the
//! dispatcher can use `?` internally and log a precise reason.

use crate::bus::BusError;
use crate::bus::Target;

#[derive(Debug, Clone)]
pub enum Error {
    /// An input parameter produced no wire value.
    Marshal { param: String, signature: &'static str },
    /// An output parameter could not be decoded from its reply field.
    Unmarshal { param: String, signature: &'static str },
    /// The reply had fewer fields than declared outputs.
    MissingOutput { param: String },
    /// The reply had more fields than declared outputs, in strict mode.
    ExtraOutputs { expected: usize, found: usize },
    /// The pool could not produce a live proxy for the target.
    InvalidEndpoint(Target),
    /// The last attempt failed on the bus.
    Bus(BusError),
    /// The target or method name broke the bus naming rules at build time.
    InvalidTarget(buspack::Error),
    /// The client was shut down.
    ShutDown,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Marshal { param, signature } => {
                write!(f, "Failed to encode input '{}' as '{}'", param, signature)
            }
            Self::Unmarshal { param, signature } => {
                write!(f, "Failed to decode output '{}' as '{}'", param, signature)
            }
            Self::MissingOutput { param } => write!(f, "Reply has no field for output '{}'", param),
            Self::ExtraOutputs { expected, found } => {
                write!(f, "Reply has {} fields, expected {}", found, expected)
            }
            Self::InvalidEndpoint(target) => write!(f, "No valid endpoint for {}", target),
            Self::Bus(e) => write!(f, "{}", e),
            Self::InvalidTarget(e) => write!(f, "Invalid call target: {}", e),
            Self::ShutDown => write!(f, "Client is shut down"),
        }
    }
}

impl std::error::Error for Error {}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
