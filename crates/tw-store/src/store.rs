//! The `OrderStore` trait.

use crate::error::StoreResult;
use async_trait::async_trait;
use tw_core::{Order, OrderId, OrderStatus};

/// Persistent storage for order records.
///
/// All operations are fallible I/O. The engine never deletes orders;
/// closure is an `update` with a terminal status.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a newly created order and return its id.
    async fn create(&self, order: &Order) -> StoreResult<OrderId>;

    /// Fetch one order by id.
    async fn get(&self, id: &OrderId) -> StoreResult<Order>;

    /// List every order currently in `status`.
    async fn list_by_status(&self, status: OrderStatus) -> StoreResult<Vec<Order>>;

    /// Persist the current state of an existing order.
    async fn update(&self, order: &Order) -> StoreResult<()>;
}
