//! # Busrpc
//!
//! Typed, synchronous method calls over a dynamically-typed message bus.
//!
//! ## Architecture
//!
//! A caller declares the shape of a call once (target, method, typed input
//! and output slots) and invokes it as often as it likes. Native values are
//! converted to and from `buspack::Value` by the wire type of each slot.
//!
//! - `wire`: the catalog of parameter types and their conversions.
//! - `shadow`: a side table that lets composite results travel as handles.
//! - `call`: declaring calls and reading or writing their slots.
//! - `registry`: live calls by id, with a check against concurrent reuse.
//! - `pool`: one cached proxy per target, recreated on retry.
//! - `dispatch`: marshal, invoke with retry, unmarshal, reset on failure.
//! - `signal`: callbacks for bus signals, run by an explicit wait loop.
//! - `client`: the context owning all of the above.
//!
//! ## Example
//!
//! ```ignore
//! let bus = Arc::new(LocalBus::new());
//! let client = Client::new(bus);
//!
//! let mut builder = client.call(Target::from_name("org.example.Clock1"), "Now");
//! let now = builder.output::<UInt64>("now");
//! let call = builder.build();
//!
//! if call.call_sync() {
//!     println!("{}", call.get(now));
//! }
//! ```

pub mod bus;
pub mod call;
pub mod client;
pub mod config;
pub mod error;
pub mod local;
pub mod pool;
pub mod shadow;
pub mod tuple;
pub mod wire;

mod dispatch;
mod macros;
mod registry;
mod signal;

pub use bus::Bus;
pub use bus::BusError;
pub use bus::ErrorClass;
pub use bus::ErrorKind;
pub use bus::Remote;
pub use bus::Signal;
pub use bus::SignalSink;
pub use bus::Target;
pub use call::Call;
pub use call::CallBuilder;
pub use call::CallId;
pub use call::In;
pub use call::Out;
pub use call::Param;
pub use client::Client;
pub use config::ClientConfig;
pub use config::RetryPolicy;
pub use local::LocalBus;
pub use pool::Endpoint;
pub use pool::Policy;
pub use shadow::Handle;
pub use shadow::HandleId;
pub use shadow::ShadowStore;
pub use tuple::Field;
pub use tuple::Tuple;
pub use tuple::TupleLayout;

pub use buspack;
