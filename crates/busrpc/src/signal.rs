//! # Signal Dispatch Loop
//!
//! Signals arrive on a channel fed by every endpoint the client creates. They
//! sit there until some thread calls `Client::wait_signals`, which runs a
//! single-threaded event loop and invokes callbacks inline, on that thread.
//!
//! ## Invariants
//!
//! - No background thread. Nothing is delivered unless someone is waiting.
//! - Callbacks registered for the same `(sender, signal)` run in registration
//!   order. An unmatched signal is dropped silently.
//! - `stop` is idempotent. The loop it stops is torn down, and the next `wait`
//!   builds a fresh one.
//! - The loop owns its own current-thread tokio runtime. `wait` must not be
//!   called from inside another runtime.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::TryLockError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use dashmap::DashMap;
use tokio::runtime::Runtime;
use tokio::sync::Notify;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use crate::bus::Signal;
use crate::bus::SignalSink;
use crate::call::lock;

/// How often a contended `wait` checks whether it may drive the loop.
const CONTENDED_POLL: Duration = Duration::from_millis(10);

pub type Callback = Arc<dyn Fn(&Signal) + Send + Sync>;

/// Callbacks keyed by `(sender, signal name)`. Entries are never removed.
#[derive(Default)]
pub(crate) struct SignalTable {
    callbacks: DashMap<(String, String), Vec<Callback>>,
}

impl SignalTable {
    pub fn add(&self, sender: &str, signal: &str, callback: Callback) {
        self.callbacks
            .entry((sender.to_string(), signal.to_string()))
            .or_default()
            .push(callback);
    }

    /// Runs every callback registered for `signal`. Returns how many ran.
    pub fn dispatch(&self, signal: &Signal) -> usize {
        let key = (signal.sender.clone(), signal.name.clone());
        // callbacks may register more callbacks; never run them under the shard lock
        let callbacks = match self.callbacks.get(&key) {
            Some(entry) => entry.value().clone(),
            None => {
                trace!("No callbacks for {} from {}", signal.name, signal.sender);
                return 0;
            }
        };
        for callback in &callbacks {
            callback(signal);
        }
        callbacks.len()
    }
}

struct EventLoop {
    runtime: Runtime,
    stopped: AtomicBool,
    wake: Notify,
}

impl EventLoop {
    fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        Ok(Self {
            runtime,
            stopped: AtomicBool::new(false),
            wake: Notify::new(),
        })
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

pub(crate) struct SignalHub {
    pub table: SignalTable,
    tx: mpsc::UnboundedSender<Signal>,
    rx: Mutex<mpsc::UnboundedReceiver<Signal>>,
    current: Mutex<Option<Arc<EventLoop>>>,
}

impl SignalHub {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            table: SignalTable::default(),
            tx,
            rx: Mutex::new(rx),
            current: Mutex::new(None),
        }
    }

    /// A sink feeding this hub, handed to the bus with every new endpoint.
    pub fn sink(&self) -> SignalSink {
        SignalSink::new(self.tx.clone())
    }

    fn current_loop(&self) -> std::io::Result<Arc<EventLoop>> {
        let mut current = lock(&self.current);
        if let Some(event_loop) = current.as_ref() {
            return Ok(Arc::clone(event_loop));
        }
        let event_loop = Arc::new(EventLoop::new()?);
        debug!("Signal loop created");
        *current = Some(Arc::clone(&event_loop));
        Ok(event_loop)
    }

    /// Delivers signals until `timeout` elapses (forever if `None`) or the
    /// loop is stopped. Returns whether the loop is still alive.
    ///
    /// Only one thread drives the loop at a time. Another caller, including a
    /// callback waiting re-entrantly, blocks without delivering anything until
    /// its timeout, a stop, or the driving thread leaving `wait`, whichever
    /// comes first, and takes over driving in the last case.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let event_loop = match self.current_loop() {
            Ok(event_loop) => event_loop,
            Err(e) => {
                error!("Failed to create signal loop: {}", e);
                return false;
            }
        };
        let deadline = timeout.map(|after| Instant::now() + after);

        let mut warned = false;
        loop {
            match self.rx.try_lock() {
                Ok(rx) => return Self::drive(&self.table, &event_loop, rx, deadline),
                Err(TryLockError::Poisoned(poisoned)) => {
                    return Self::drive(&self.table, &event_loop, poisoned.into_inner(), deadline);
                }
                Err(TryLockError::WouldBlock) => {}
            }
            if event_loop.is_stopped() {
                return false;
            }
            let remaining = deadline.map(|at| at.saturating_duration_since(Instant::now()));
            if remaining == Some(Duration::ZERO) {
                return true;
            }
            if !warned {
                warn!("Signal loop is already being driven by another wait");
                warned = true;
            }
            std::thread::sleep(remaining.map_or(CONTENDED_POLL, |r| r.min(CONTENDED_POLL)));
        }
    }

    fn drive(
        table: &SignalTable,
        event_loop: &Arc<EventLoop>,
        mut rx: MutexGuard<'_, mpsc::UnboundedReceiver<Signal>>,
        deadline: Option<Instant>,
    ) -> bool {
        let state = Arc::clone(event_loop);
        event_loop.runtime.block_on(async move {
            let expiry = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at.into()).await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::pin!(expiry);

            while !state.is_stopped() {
                tokio::select! {
                    biased;
                    _ = state.wake.notified() => {}
                    signal = rx.recv() => match signal {
                        Some(signal) => {
                            let ran = table.dispatch(&signal);
                            trace!("Delivered {} from {} to {} callbacks", signal.name, signal.sender, ran);
                        }
                        None => break,
                    },
                    _ = &mut expiry => break,
                }
            }
        });

        !event_loop.is_stopped()
    }

    /// Stops the current loop, if any. Idempotent.
    ///
    /// A `wait` in progress returns `false` promptly; the loop is torn down
    /// once that `wait` returns.
    pub fn stop(&self) {
        let Some(event_loop) = lock(&self.current).take() else {
            return;
        };
        event_loop.stopped.store(true, Ordering::Release);
        event_loop.wake.notify_one();
        debug!("Signal loop stopped");
    }

    pub fn is_running(&self) -> bool {
        lock(&self.current).is_some()
    }
}
