//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use busrpc::BusError;
use busrpc::Client;
use busrpc::ClientConfig;
use busrpc::LocalBus;
use busrpc::Target;
use tracing_subscriber::EnvFilter;

pub const SERVICE: &str = "org.example.Net1";

/// Routes library logs to the test harness. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn target() -> Target {
    Target::from_name(SERVICE)
}

/// A bus with `SERVICE` replying with its own arguments, and a client on it.
pub fn echo() -> (Arc<LocalBus>, Client) {
    init_tracing();
    let bus = Arc::new(LocalBus::new());
    bus.serve(SERVICE, |_, args| Ok(args.to_vec()));
    let client = Client::new(bus.clone());
    (bus, client)
}

/// A bus where `SERVICE` always fails with `error`.
pub fn failing(error: BusError, config: ClientConfig) -> (Arc<LocalBus>, Client) {
    init_tracing();
    let bus = Arc::new(LocalBus::new());
    bus.serve(SERVICE, move |_, _| Err(error.clone()));
    let client = Client::with_config(bus.clone(), config);
    (bus, client)
}
