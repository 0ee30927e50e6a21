//! Signal registration and the dispatch loop.

mod common;

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use busrpc::BusError;
use busrpc::Client;
use busrpc::ClientConfig;
use busrpc::LocalBus;
use busrpc::Signal;
use busrpc::Target;
use busrpc::buspack::Value;

use common::SERVICE;
use common::target;

const TICK: Duration = Duration::from_millis(50);

fn setup() -> (Arc<LocalBus>, Client) {
    common::init_tracing();
    let bus = Arc::new(LocalBus::new());
    let client = Client::new(bus.clone());
    (bus, client)
}

fn signal(target: &Target, name: &str, args: Vec<Value>) -> Signal {
    Signal {
        sender: target.name.clone(),
        path: target.path.clone(),
        interface: target.interface.clone(),
        name: name.to_string(),
        args,
    }
}

type Log = Arc<Mutex<Vec<String>>>;

fn recorder(log: &Log, tag: &'static str) -> impl Fn(&Signal) + Send + Sync + 'static {
    let log = log.clone();
    move |signal: &Signal| {
        log.lock().unwrap().push(format!("{}:{}", tag, signal.name));
    }
}

// --- Delivery Tests ---

#[test]
fn test_callbacks_run_in_registration_order() {
    let (bus, client) = setup();
    let log = Log::default();
    assert!(client.register_signal(&target(), "LinkUp", recorder(&log, "first")));
    assert!(client.register_signal(&target(), "LinkUp", recorder(&log, "second")));

    assert_eq!(bus.emit(signal(&target(), "LinkUp", vec![Value::from("eth0")])), 1);
    assert!(client.wait_signals(Some(TICK)));

    assert_eq!(*log.lock().unwrap(), ["first:LinkUp", "second:LinkUp"]);
}

#[test]
fn test_nothing_runs_without_wait() {
    let (bus, client) = setup();
    let log = Log::default();
    client.register_signal(&target(), "LinkUp", recorder(&log, "cb"));

    bus.emit(signal(&target(), "LinkUp", vec![]));
    std::thread::sleep(TICK);
    assert!(log.lock().unwrap().is_empty());

    client.wait_signals(Some(TICK));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn test_unmatched_signals_are_dropped() {
    let (bus, client) = setup();
    let log = Log::default();
    client.register_signal(&target(), "LinkUp", recorder(&log, "cb"));

    bus.emit(signal(&target(), "LinkDown", vec![]));
    let elsewhere = Target::from_name("org.example.Other1");
    assert_eq!(bus.emit(signal(&elsewhere, "LinkUp", vec![])), 0);

    assert!(client.wait_signals(Some(TICK)));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_signal_arguments_reach_callback() {
    let (bus, client) = setup();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    client.register_signal_by_name(SERVICE, "Counter", move |s: &Signal| {
        sink.lock().unwrap().extend(s.args.iter().filter_map(Value::as_u32));
    });

    for n in 1..=3 {
        bus.emit(signal(&Target::from_name(SERVICE), "Counter", vec![Value::UInt32(n)]));
    }
    client.wait_signals(Some(TICK));
    assert_eq!(*seen.lock().unwrap(), [1, 2, 3]);
}

#[test]
fn test_retries_do_not_duplicate_subscriptions() {
    common::init_tracing();
    let bus = Arc::new(LocalBus::new());
    let config = ClientConfig::default().with_backoff(Duration::from_millis(5));
    let client = Client::with_config(bus.clone(), config);
    let log = Log::default();
    client.register_signal(&target(), "LinkUp", recorder(&log, "cb"));

    // nobody serves the target, so every retry recreates the endpoint
    let call = client.call(target(), "Missing").build();
    assert!(!call.call_sync());
    assert_eq!(bus.connects(), 3);

    assert_eq!(bus.emit(signal(&target(), "LinkUp", vec![])), 1);
    client.wait_signals(Some(TICK));
    assert_eq!(log.lock().unwrap().len(), 1);
}

// --- Registration Tests ---

#[test]
fn test_registration_reports_endpoint_validity() {
    let (bus, client) = setup();
    bus.fail_connect(SERVICE, Some(BusError::access_denied("policy")));
    let log = Log::default();
    assert!(!client.register_signal(&target(), "LinkUp", recorder(&log, "cb")));

    bus.fail_connect(SERVICE, None);
    assert!(client.register_signal(&target(), "LinkUp", recorder(&log, "again")));
    bus.emit(signal(&target(), "LinkUp", vec![]));
    client.wait_signals(Some(TICK));
    assert_eq!(*log.lock().unwrap(), ["cb:LinkUp", "again:LinkUp"]);
}

#[test]
fn test_invalid_signal_name_is_rejected() {
    let (bus, client) = setup();
    assert!(!client.register_signal(&target(), "Link.Up", |_: &Signal| {}));
    assert_eq!(bus.connects(), 0);
}

// --- Loop Lifecycle Tests ---

#[test]
fn test_wait_honors_timeout() {
    let (_bus, client) = setup();
    let started = Instant::now();
    assert!(client.wait_signals(Some(TICK)));
    let elapsed = started.elapsed();
    assert!(elapsed >= TICK);
    assert!(elapsed < Duration::from_secs(2));
}

#[test]
fn test_stop_and_recreate() {
    let (_bus, client) = setup();
    assert!(!client.signals_running());
    assert!(client.wait_signals(Some(TICK)));
    assert!(client.signals_running());

    client.stop_signals();
    client.stop_signals();
    assert!(!client.signals_running());

    assert!(client.wait_signals(Some(TICK)));
    assert!(client.signals_running());
}

#[test]
fn test_stop_from_callback_ends_wait() {
    let (bus, client) = setup();
    let stopper = client.clone();
    client.register_signal(&target(), "Shutdown", move |_: &Signal| stopper.stop_signals());

    bus.emit(signal(&target(), "Shutdown", vec![]));
    let started = Instant::now();
    assert!(!client.wait_signals(None));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!client.signals_running());
}

#[test]
fn test_stop_from_other_thread_ends_wait() {
    let (_bus, client) = setup();
    let stopper = client.clone();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(TICK);
        stopper.stop_signals();
    });

    // wait for the loop to exist before it can be stopped
    while !client.signals_running() {
        client.wait_signals(Some(Duration::from_millis(1)));
    }
    let alive = client.wait_signals(Some(Duration::from_secs(10)));
    handle.join().unwrap();

    if alive {
        // stop landed before this wait, which then built a fresh loop
        assert!(client.signals_running());
    } else {
        assert!(!client.signals_running());
    }
}

#[test]
fn test_second_waiter_sees_live_loop() {
    let (_bus, client) = setup();
    let driver = client.clone();
    let first = std::thread::spawn(move || driver.wait_signals(Some(Duration::from_millis(400))));

    while !client.signals_running() {
        std::thread::yield_now();
    }
    std::thread::sleep(TICK);
    assert!(client.wait_signals(Some(Duration::from_millis(10))));
    assert!(client.signals_running());
    assert!(first.join().unwrap());
}

#[test]
fn test_second_waiter_takes_over_and_sees_stop() {
    let (bus, client) = setup();
    let log = Log::default();
    client.register_signal(&target(), "LinkUp", recorder(&log, "cb"));

    let driver = client.clone();
    let first = std::thread::spawn(move || driver.wait_signals(Some(TICK)));
    while !client.signals_running() {
        std::thread::yield_now();
    }

    // outlives the first wait, so it ends up driving the loop itself
    let waiter = client.clone();
    let second = std::thread::spawn(move || waiter.wait_signals(Some(Duration::from_secs(10))));
    assert!(first.join().unwrap());

    bus.emit(signal(&target(), "LinkUp", vec![]));
    let started = Instant::now();
    while log.lock().unwrap().is_empty() && started.elapsed() < Duration::from_secs(5) {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(log.lock().unwrap().len(), 1);

    client.stop_signals();
    assert!(!second.join().unwrap());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_shutdown_stops_loop() {
    let (_bus, client) = setup();
    client.wait_signals(Some(TICK));
    client.shutdown();
    assert!(!client.signals_running());
}
