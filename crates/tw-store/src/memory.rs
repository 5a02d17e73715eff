//! In-memory order store.

use crate::error::{StoreError, StoreResult};
use crate::store::OrderStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tw_core::{Order, OrderId, OrderStatus};

/// HashMap-backed store for tests and standalone runs.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders, across all statuses.
    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create(&self, order: &Order) -> StoreResult<OrderId> {
        self.orders
            .write()
            .insert(order.id.clone(), order.clone());
        Ok(order.id.clone())
    }

    async fn get(&self, id: &OrderId) -> StoreResult<Order> {
        self.orders
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list_by_status(&self, status: OrderStatus) -> StoreResult<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .values()
            .filter(|o| o.status == status)
            .cloned()
            .collect())
    }

    async fn update(&self, order: &Order) -> StoreResult<()> {
        let mut orders = self.orders.write();
        if !orders.contains_key(&order.id) {
            return Err(StoreError::NotFound(order.id.to_string()));
        }
        orders.insert(order.id.clone(), order.clone());
        Ok(())
    }
}
