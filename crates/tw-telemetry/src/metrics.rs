//! Prometheus metrics for the trigger service.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration
//! failure means a duplicate metric name, a fatal configuration error that
//! should crash at startup rather than fail silently. These panics only
//! occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec, Counter,
    CounterVec, Gauge, GaugeVec,
};

/// Feed connection state (1 = connected, 0 = disconnected).
pub static FEED_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("tw_feed_connected", "Feed connection state (1=connected)").unwrap()
});

/// Total feed reconnection attempts.
pub static FEED_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tw_feed_reconnect_total",
        "Total feed reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Total ticks normalized and handed to the engine.
pub static TICKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tw_ticks_total",
        "Total price ticks processed",
        &["symbol"]
    )
    .unwrap()
});

/// Total inbound frames skipped (control frames, unknown channels).
pub static FRAMES_SKIPPED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "tw_frames_skipped_total",
        "Total inbound frames skipped as non-ticker"
    )
    .unwrap()
});

/// Total malformed inbound frames.
pub static FRAMES_MALFORMED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "tw_frames_malformed_total",
        "Total inbound frames dropped as malformed"
    )
    .unwrap()
});

/// Total order transitions, by transition and close reason.
pub static TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tw_transitions_total",
        "Total order state transitions",
        &["transition", "reason"]
    )
    .unwrap()
});

/// Total persistence write failures after all retries.
pub static PERSIST_FAILURES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "tw_persist_failures_total",
        "Total order updates that could not be persisted"
    )
    .unwrap()
});

/// Total trigger events dropped for lack of an observer.
pub static NOTIFICATIONS_DROPPED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "tw_notifications_dropped_total",
        "Total trigger events dropped without delivery"
    )
    .unwrap()
});

/// Active orders in the working set, by symbol.
pub static ACTIVE_ORDERS: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "tw_active_orders",
        "Active (pending or open) orders in the working set",
        &["symbol"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    pub fn feed_connected() {
        FEED_CONNECTED.set(1.0);
    }

    pub fn feed_disconnected() {
        FEED_CONNECTED.set(0.0);
    }

    pub fn feed_reconnect(reason: &str) {
        FEED_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn tick_processed(symbol: &str) {
        TICKS_TOTAL.with_label_values(&[symbol]).inc();
    }

    pub fn frame_skipped() {
        FRAMES_SKIPPED_TOTAL.inc();
    }

    pub fn frame_malformed() {
        FRAMES_MALFORMED_TOTAL.inc();
    }

    pub fn transition(transition: &str, reason: &str) {
        TRANSITIONS_TOTAL
            .with_label_values(&[transition, reason])
            .inc();
    }

    pub fn persist_failure() {
        PERSIST_FAILURES_TOTAL.inc();
    }

    pub fn notification_dropped() {
        NOTIFICATIONS_DROPPED_TOTAL.inc();
    }

    pub fn active_orders(symbol: &str, count: f64) {
        ACTIVE_ORDERS.with_label_values(&[symbol]).set(count);
    }
}
