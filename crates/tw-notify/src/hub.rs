//! The notification hub.
//!
//! Holds at most one live observer per owner (last-registered wins) and
//! delivers trigger events best-effort. Durable delivery is explicitly not
//! guaranteed; clients reconcile through the query API.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;
use tw_core::TriggerEvent;

struct Observer {
    id: u64,
    tx: mpsc::Sender<TriggerEvent>,
}

/// A registered observer's receiving end.
///
/// `observer_id` identifies this registration so a stale disconnect can be
/// cleaned up without evicting a newer connection for the same owner.
pub struct Subscription {
    pub observer_id: u64,
    pub receiver: mpsc::Receiver<TriggerEvent>,
}

/// Per-owner observer registry with best-effort publish.
pub struct NotificationHub {
    observers: DashMap<String, Observer>,
    next_id: AtomicU64,
    buffer: usize,
}

impl NotificationHub {
    /// Create a hub whose observer channels buffer `buffer` events.
    pub fn new(buffer: usize) -> Self {
        Self {
            observers: DashMap::new(),
            next_id: AtomicU64::new(1),
            buffer,
        }
    }

    /// Register an observer for an owner, replacing any previous one.
    pub fn register(&self, owner_id: &str) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);

        if self
            .observers
            .insert(owner_id.to_string(), Observer { id, tx })
            .is_some()
        {
            debug!(owner_id, "Replaced existing observer");
        }

        Subscription {
            observer_id: id,
            receiver: rx,
        }
    }

    /// Remove whatever observer is registered for an owner.
    pub fn unregister(&self, owner_id: &str) {
        self.observers.remove(owner_id);
    }

    /// Remove the observer for an owner only if it is still the given
    /// registration. A disconnect handler for an old connection must not
    /// evict a newer one.
    pub fn unregister_observer(&self, owner_id: &str, observer_id: u64) {
        self.observers
            .remove_if(owner_id, |_, observer| observer.id == observer_id);
    }

    /// Deliver an event to the owner's observer, if any.
    ///
    /// Fire-and-forget: returns whether the event was handed off. A
    /// missing observer or a full/closed channel drops the event and is
    /// never an error.
    pub fn publish(&self, event: &TriggerEvent) -> bool {
        let Some(observer) = self.observers.get(&event.owner_id) else {
            debug!(owner_id = %event.owner_id, "No observer registered, event dropped");
            return false;
        };

        match observer.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(e) => {
                debug!(owner_id = %event.owner_id, ?e, "Observer not receiving, event dropped");
                false
            }
        }
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tw_core::{OrderId, OrderStatus, Price};

    fn event_for(owner: &str) -> TriggerEvent {
        TriggerEvent {
            order_id: OrderId::new(),
            owner_id: owner.to_string(),
            symbol: "BTCUSDT".to_string(),
            from_status: OrderStatus::Pending,
            to_status: OrderStatus::Open,
            price: Price::new(dec!(100)),
            reason: None,
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_delivers_to_registered_observer() {
        let hub = NotificationHub::new(16);
        let mut sub = hub.register("user-1");

        assert!(hub.publish(&event_for("user-1")));

        let delivered = sub.receiver.recv().await.unwrap();
        assert_eq!(delivered.owner_id, "user-1");
    }

    #[tokio::test]
    async fn test_publish_without_observer_is_silent() {
        let hub = NotificationHub::new(16);
        assert!(!hub.publish(&event_for("nobody")));
        // Subsequent publishes still work.
        let mut sub = hub.register("user-1");
        assert!(hub.publish(&event_for("user-1")));
        assert!(sub.receiver.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let hub = NotificationHub::new(16);
        let mut first = hub.register("user-1");
        let mut second = hub.register("user-1");

        assert_eq!(hub.observer_count(), 1);
        assert!(hub.publish(&event_for("user-1")));

        assert!(second.receiver.recv().await.is_some());
        // The replaced channel got nothing and its sender is gone.
        assert!(first.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stale_unregister_keeps_newer_observer() {
        let hub = NotificationHub::new(16);
        let stale = hub.register("user-1");
        let mut fresh = hub.register("user-1");

        // Old connection's disconnect handler fires late.
        hub.unregister_observer("user-1", stale.observer_id);
        assert_eq!(hub.observer_count(), 1);

        assert!(hub.publish(&event_for("user-1")));
        assert!(fresh.receiver.recv().await.is_some());

        hub.unregister_observer("user-1", fresh.observer_id);
        assert_eq!(hub.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_full_buffer_drops_without_blocking() {
        let hub = NotificationHub::new(1);
        let _sub = hub.register("user-1");

        assert!(hub.publish(&event_for("user-1")));
        // Buffer full: dropped, not blocked.
        assert!(!hub.publish(&event_for("user-1")));
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_error() {
        let hub = NotificationHub::new(16);
        let sub = hub.register("user-1");
        drop(sub);
        assert!(!hub.publish(&event_for("user-1")));
    }
}
