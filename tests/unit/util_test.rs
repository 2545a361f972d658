//! Tests for utility functions

use std::thread;
use std::time::Duration;

use prometheus_pool_guard::config::Schedule;
use prometheus_pool_guard::util::{now_ms, panic_message, DynamicProperty};

#[test]
fn test_dynamic_property_visible_across_threads() {
    let property = DynamicProperty::of(Schedule::with_delay(Duration::from_millis(300)));
    let writer = property.clone();

    thread::spawn(move || {
        writer.set(Schedule::with_delay(Duration::from_millis(50)));
    })
    .join()
    .unwrap();

    assert_eq!(property.get().period(), Duration::from_millis(50));
}

#[test]
fn test_dynamic_property_set_returns_previous() {
    let property = DynamicProperty::of(3_u32);
    assert_eq!(property.set(4), 3);
    assert_eq!(property.with(|v| v * 10), 40);
}

#[test]
fn test_panic_message_from_payload() {
    let payload = std::panic::catch_unwind(|| panic!("queue {} stuck", 7)).unwrap_err();
    assert_eq!(panic_message(payload.as_ref()), "queue 7 stuck");
}

#[test]
fn test_now_ms_advances() {
    let before = now_ms();
    thread::sleep(Duration::from_millis(5));
    assert!(now_ms() > before);
}

#[test]
fn test_init_tracing_is_idempotent() {
    prometheus_pool_guard::util::init_tracing();
    prometheus_pool_guard::util::init_tracing();
    tracing::info!("tracing initialized for tests");
}
