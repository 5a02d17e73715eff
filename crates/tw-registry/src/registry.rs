//! Symbol refcounts driving subscribe/unsubscribe.

use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use tw_core::Order;
use tw_ws::FeedHandle;

/// Tracks how many active orders reference each symbol and drives the
/// transport's subscription set from the transitions.
///
/// The count map is a tokio mutex held across the feed calls, so
/// concurrent creation and closure serialize here and the subscribe /
/// unsubscribe sequence always matches the count transitions.
pub struct SubscriptionRegistry {
    counts: Mutex<HashMap<String, usize>>,
    feed: FeedHandle,
}

impl SubscriptionRegistry {
    pub fn new(feed: FeedHandle) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            feed,
        }
    }

    /// An order entered the working set. First order on a symbol
    /// subscribes it.
    pub async fn on_order_created(&self, order: &Order) {
        let mut counts = self.counts.lock().await;
        let count = counts.entry(order.symbol.clone()).or_insert(0);
        *count += 1;
        debug!(symbol = %order.symbol, count = *count, "Order added to registry");
        if *count == 1 {
            self.feed.subscribe(&order.symbol).await;
        }
    }

    /// An order left the working set. Last order on a symbol
    /// unsubscribes it.
    pub async fn on_order_closed(&self, order: &Order) {
        let mut counts = self.counts.lock().await;
        match counts.get_mut(&order.symbol) {
            Some(count) if *count > 1 => {
                *count -= 1;
                debug!(symbol = %order.symbol, count = *count, "Order removed from registry");
            }
            Some(_) => {
                counts.remove(&order.symbol);
                debug!(symbol = %order.symbol, "Last order on symbol, unsubscribing");
                self.feed.unsubscribe(&order.symbol).await;
            }
            None => {
                warn!(symbol = %order.symbol, "Close for untracked symbol");
            }
        }
    }

    /// Symbols with at least one active order, sorted.
    pub async fn active_symbols(&self) -> Vec<String> {
        let counts = self.counts.lock().await;
        let mut symbols: Vec<String> = counts.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Active order count for one symbol.
    pub async fn order_count(&self, symbol: &str) -> usize {
        self.counts.lock().await.get(symbol).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tw_core::{OrderDraft, OrderSide, Price};
    use tw_ws::{ConnectionConfig, ConnectionManager};

    fn order(symbol: &str) -> Order {
        OrderDraft {
            owner_id: "user-1".to_string(),
            symbol: symbol.to_string(),
            side: OrderSide::Long,
            entry_price: Price::new(dec!(100)),
            stop_loss: None,
            take_profit: None,
            margin: dec!(10),
            leverage: dec!(2),
        }
        .into_order(Utc::now())
        .unwrap()
    }

    fn registry() -> (SubscriptionRegistry, FeedHandle) {
        let (frame_tx, _frame_rx) = mpsc::channel(8);
        let manager = ConnectionManager::new(ConnectionConfig::default(), frame_tx);
        let handle = manager.handle();
        (SubscriptionRegistry::new(handle.clone()), handle)
    }

    #[tokio::test]
    async fn test_first_order_subscribes() {
        let (registry, feed) = registry();

        registry.on_order_created(&order("BTCUSDT")).await;
        assert_eq!(feed.active_symbols(), vec!["BTCUSDT"]);
        assert_eq!(registry.order_count("BTCUSDT").await, 1);
    }

    #[tokio::test]
    async fn test_second_order_does_not_resubscribe() {
        let (registry, feed) = registry();

        registry.on_order_created(&order("BTCUSDT")).await;
        registry.on_order_created(&order("BTCUSDT")).await;

        assert_eq!(registry.order_count("BTCUSDT").await, 2);
        assert_eq!(feed.active_symbols(), vec!["BTCUSDT"]);
    }

    #[tokio::test]
    async fn test_last_close_unsubscribes() {
        let (registry, feed) = registry();
        let a = order("BTCUSDT");
        let b = order("BTCUSDT");

        registry.on_order_created(&a).await;
        registry.on_order_created(&b).await;

        registry.on_order_closed(&a).await;
        assert_eq!(feed.active_symbols(), vec!["BTCUSDT"]);

        registry.on_order_closed(&b).await;
        assert!(feed.active_symbols().is_empty());
        assert!(registry.active_symbols().await.is_empty());
    }

    #[tokio::test]
    async fn test_untracked_close_is_harmless() {
        let (registry, feed) = registry();
        registry.on_order_closed(&order("BTCUSDT")).await;
        assert!(feed.active_symbols().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_creates_and_closes_converge() {
        let (registry, feed) = registry();
        let registry = Arc::new(registry);

        // Overlapping symbols created and closed concurrently; afterwards
        // the subscription set must equal the union of surviving symbols.
        let mut handles = Vec::new();
        for _ in 0..10 {
            let reg = registry.clone();
            handles.push(tokio::spawn(async move {
                let o = order("BTCUSDT");
                reg.on_order_created(&o).await;
                reg.on_order_closed(&o).await;
            }));
            let reg = registry.clone();
            handles.push(tokio::spawn(async move {
                reg.on_order_created(&order("ETHUSDT")).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // All BTCUSDT orders were closed; ETHUSDT survivors remain.
        assert_eq!(registry.active_symbols().await, vec!["ETHUSDT"]);
        assert_eq!(feed.active_symbols(), vec!["ETHUSDT"]);
        assert_eq!(registry.order_count("ETHUSDT").await, 10);
        assert_eq!(registry.order_count("BTCUSDT").await, 0);
    }
}
