//! Keepalive monitoring for the feed connection.
//!
//! Tracks ping/pong timing and inbound traffic; silence past the grace
//! window after a ping marks the connection stale.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::time::Duration;
use tracing::debug;

/// Keepalive state for one logical connection.
pub struct Keepalive {
    /// How often to send a ping while the line is otherwise quiet.
    interval_ms: u64,
    /// How long to wait for a pong after a ping.
    grace_ms: u64,
    last_ping: RwLock<Option<DateTime<Utc>>>,
    last_message: RwLock<DateTime<Utc>>,
    waiting_for_pong: RwLock<bool>,
}

impl Keepalive {
    pub fn new(interval_ms: u64, grace_ms: u64) -> Self {
        Self {
            interval_ms,
            grace_ms,
            last_ping: RwLock::new(None),
            last_message: RwLock::new(Utc::now()),
            waiting_for_pong: RwLock::new(false),
        }
    }

    /// Reset state (called on every new connection).
    pub fn reset(&self) {
        *self.last_ping.write() = None;
        *self.last_message.write() = Utc::now();
        *self.waiting_for_pong.write() = false;
    }

    /// Record that a ping was sent.
    pub fn record_ping(&self) {
        *self.last_ping.write() = Some(Utc::now());
        *self.waiting_for_pong.write() = true;
    }

    /// Record that a pong was received.
    pub fn record_pong(&self) {
        let now = Utc::now();
        *self.waiting_for_pong.write() = false;

        if let Some(ping_time) = *self.last_ping.read() {
            let rtt_ms = (now - ping_time).num_milliseconds();
            debug!(rtt_ms, "Keepalive pong received");
        }
    }

    /// Record that any inbound frame arrived.
    pub fn record_message(&self) {
        *self.last_message.write() = Utc::now();
    }

    /// Whether the grace window elapsed without a pong.
    pub fn is_stale(&self) -> bool {
        if !*self.waiting_for_pong.read() {
            return false;
        }
        if let Some(ping_time) = *self.last_ping.read() {
            let elapsed_ms = (Utc::now() - ping_time).num_milliseconds();
            return elapsed_ms > self.grace_ms as i64;
        }
        false
    }

    /// Whether a ping is due.
    ///
    /// Inbound traffic counts as liveness, so a busy line never pings.
    pub fn should_send_ping(&self) -> bool {
        if *self.waiting_for_pong.read() {
            return false;
        }
        let since_last = (Utc::now() - *self.last_message.read()).num_milliseconds();
        since_last >= self.interval_ms as i64
    }

    /// Sleep until the next keepalive check.
    pub async fn wait_for_check(&self) {
        tokio::time::sleep(Duration::from_millis(self.interval_ms / 2)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let ka = Keepalive::new(30_000, 35_000);
        assert!(!ka.is_stale());
        assert!(!ka.should_send_ping());
    }

    #[test]
    fn test_ping_pong_cycle() {
        let ka = Keepalive::new(30_000, 35_000);

        ka.record_ping();
        assert!(*ka.waiting_for_pong.read());
        // Grace window has not elapsed yet.
        assert!(!ka.is_stale());

        ka.record_pong();
        assert!(!*ka.waiting_for_pong.read());
        assert!(!ka.is_stale());
    }

    #[test]
    fn test_no_ping_while_waiting() {
        let ka = Keepalive::new(0, 35_000);
        // interval 0: a ping is immediately due on a quiet line
        assert!(ka.should_send_ping());
        ka.record_ping();
        assert!(!ka.should_send_ping());
    }

    #[test]
    fn test_traffic_suppresses_ping() {
        let ka = Keepalive::new(30_000, 35_000);
        ka.record_message();
        assert!(!ka.should_send_ping());
    }
}
