//! The in-memory working set.
//!
//! Index of non-terminal orders, partitioned by symbol so a tick only
//! touches the partition it concerns. Not synchronized itself; the engine
//! wraps it in a single lock.

use std::collections::HashMap;
use tw_core::{Order, OrderId};

/// Symbol-partitioned index of active orders.
#[derive(Default)]
pub struct WorkingSet {
    by_symbol: HashMap<String, HashMap<OrderId, Order>>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an active order into its symbol partition.
    pub fn insert(&mut self, order: Order) {
        self.by_symbol
            .entry(order.symbol.clone())
            .or_default()
            .insert(order.id.clone(), order);
    }

    /// Remove one order, dropping the partition when it empties.
    pub fn remove(&mut self, symbol: &str, id: &OrderId) -> Option<Order> {
        let partition = self.by_symbol.get_mut(symbol)?;
        let removed = partition.remove(id);
        if partition.is_empty() {
            self.by_symbol.remove(symbol);
        }
        removed
    }

    /// Mutable access to one symbol's partition.
    pub fn partition_mut(&mut self, symbol: &str) -> Option<&mut HashMap<OrderId, Order>> {
        self.by_symbol.get_mut(symbol)
    }

    /// Locate an order by id across partitions.
    pub fn find(&self, id: &OrderId) -> Option<&Order> {
        self.by_symbol.values().find_map(|p| p.get(id))
    }

    /// Active orders on one symbol.
    pub fn symbol_count(&self, symbol: &str) -> usize {
        self.by_symbol.get(symbol).map_or(0, HashMap::len)
    }

    /// Symbols with at least one active order, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.by_symbol.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Total active orders.
    pub fn len(&self) -> usize {
        self.by_symbol.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tw_core::{OrderDraft, OrderSide, Price};

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

    #[test]
    fn test_insert_partitions_by_symbol() {
        let mut set = WorkingSet::new();
        set.insert(order("BTCUSDT"));
        set.insert(order("BTCUSDT"));
        set.insert(order("ETHUSDT"));

        assert_eq!(set.symbol_count("BTCUSDT"), 2);
        assert_eq!(set.symbol_count("ETHUSDT"), 1);
        assert_eq!(set.len(), 3);
        assert_eq!(set.symbols(), vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn test_remove_drops_empty_partition() {
        let mut set = WorkingSet::new();
        let o = order("BTCUSDT");
        let id = o.id.clone();
        set.insert(o);

        let removed = set.remove("BTCUSDT", &id).unwrap();
        assert_eq!(removed.id, id);
        assert!(set.is_empty());
        assert!(set.symbols().is_empty());
    }

    #[test]
    fn test_find_across_partitions() {
        let mut set = WorkingSet::new();
        let o = order("ETHUSDT");
        let id = o.id.clone();
        set.insert(order("BTCUSDT"));
        set.insert(o);

        assert_eq!(set.find(&id).unwrap().symbol, "ETHUSDT");
        assert!(set.find(&tw_core::OrderId::new()).is_none());
    }
}
