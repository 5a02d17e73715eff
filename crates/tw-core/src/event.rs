//! Tick and trigger-event types.

use crate::decimal::Price;
use crate::order::{CloseReason, OrderId, OrderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One price observation for one instrument at one instant.
///
/// Ephemeral: produced by the normalizer, consumed immediately by the
/// engine, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTick {
    pub symbol: String,
    pub price: Price,
    pub observed_at: DateTime<Utc>,
}

impl PriceTick {
    pub fn new(symbol: impl Into<String>, price: Price, observed_at: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            observed_at,
        }
    }
}

/// A state transition caused by a tick (or a manual close).
///
/// Emitted once per transition; delivery to observers is at-most-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    pub order_id: OrderId,
    pub owner_id: String,
    pub symbol: String,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
    /// The tick price that caused the transition.
    pub price: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<CloseReason>,
    pub occurred_at: DateTime<Utc>,
}

impl TriggerEvent {
    /// Event kind string for the client wire format.
    pub fn kind(&self) -> &'static str {
        match self.to_status {
            OrderStatus::Open => "order_opened",
            OrderStatus::Closed => "order_closed",
            OrderStatus::Pending => "order_pending",
        }
    }

    /// The JSON frame delivered to a subscribed client connection.
    pub fn client_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "type": self.kind(),
            "orderId": self.order_id.as_str(),
            "symbol": self.symbol,
            "status": self.to_status,
            "price": self.price,
        })
    }
}
