//! Conditional-order types and lifecycle state machine.
//!
//! An order is created `Pending`, becomes `Open` when its entry condition
//! is met, and `Closed` when an exit level is hit or it is closed manually.
//! `Closed` is terminal.

use crate::decimal::{Price, Size};
use crate::error::{OrderError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique order identifier, assigned at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Create a new unique order ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string (for store round-trips).
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Order direction.
///
/// Stored explicitly on every order; the comparison direction for entry
/// and exit conditions derives from it and is never inferred from the
/// relative ordering of price levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Long,
    Short,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Waiting for the entry condition.
    Pending,
    /// Entry met, waiting for an exit condition.
    Open,
    /// Terminal. No transition out.
    Closed,
}

impl OrderStatus {
    /// Whether the order still participates in tick evaluation.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Open)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Why an order was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    TakeProfit,
    StopLoss,
    Manual,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TakeProfit => write!(f, "take_profit"),
            Self::StopLoss => write!(f, "stop_loss"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Unvalidated order submission, as received from the external API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    pub owner_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub entry_price: Price,
    pub stop_loss: Option<Price>,
    pub take_profit: Option<Price>,
    pub margin: Decimal,
    pub leverage: Decimal,
}

impl OrderDraft {
    /// Validate the draft and build a `Pending` order.
    ///
    /// Rejected drafts never reach the engine's working set.
    pub fn into_order(self, now: DateTime<Utc>) -> Result<Order> {
        if self.owner_id.trim().is_empty() {
            return Err(OrderError::InvalidOwner("owner_id is empty".to_string()));
        }
        let symbol = self.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(OrderError::InvalidSymbol("symbol is empty".to_string()));
        }
        if !self.entry_price.is_positive() {
            return Err(OrderError::InvalidPrice(format!(
                "entry_price must be positive, got {}",
                self.entry_price
            )));
        }
        if self.margin <= Decimal::ZERO {
            return Err(OrderError::InvalidSizing(format!(
                "margin must be positive, got {}",
                self.margin
            )));
        }
        if self.leverage < Decimal::ONE {
            return Err(OrderError::InvalidSizing(format!(
                "leverage must be >= 1, got {}",
                self.leverage
            )));
        }

        validate_bracket(self.side, self.entry_price, self.stop_loss, self.take_profit)?;

        Ok(Order {
            id: OrderId::new(),
            owner_id: self.owner_id,
            symbol,
            side: self.side,
            entry_price: self.entry_price,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            margin: self.margin,
            leverage: self.leverage,
            quantity: Size::new(self.margin * self.leverage),
            status: OrderStatus::Pending,
            close_reason: None,
            created_at: now,
            executed_at: None,
            closed_at: None,
        })
    }
}

/// Check that exit levels sit on the correct side of the entry price.
///
/// Long: stop_loss < entry < take_profit. Short: take_profit < entry < stop_loss.
/// Each level is checked independently so a single-sided order validates too.
fn validate_bracket(
    side: OrderSide,
    entry: Price,
    stop_loss: Option<Price>,
    take_profit: Option<Price>,
) -> Result<()> {
    match side {
        OrderSide::Long => {
            if let Some(sl) = stop_loss {
                if sl >= entry {
                    return Err(OrderError::BracketViolation(format!(
                        "long stop_loss {sl} must be below entry {entry}"
                    )));
                }
            }
            if let Some(tp) = take_profit {
                if tp <= entry {
                    return Err(OrderError::BracketViolation(format!(
                        "long take_profit {tp} must be above entry {entry}"
                    )));
                }
            }
        }
        OrderSide::Short => {
            if let Some(sl) = stop_loss {
                if sl <= entry {
                    return Err(OrderError::BracketViolation(format!(
                        "short stop_loss {sl} must be above entry {entry}"
                    )));
                }
            }
            if let Some(tp) = take_profit {
                if tp >= entry {
                    return Err(OrderError::BracketViolation(format!(
                        "short take_profit {tp} must be below entry {entry}"
                    )));
                }
            }
        }
    }
    Ok(())
}

/// A conditional order.
///
/// Mutated exclusively by the trigger engine; closure is a status change,
/// never removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub entry_price: Price,
    pub stop_loss: Option<Price>,
    pub take_profit: Option<Price>,
    pub margin: Decimal,
    pub leverage: Decimal,
    /// Computed once at creation: margin * leverage.
    pub quantity: Size,
    pub status: OrderStatus,
    pub close_reason: Option<CloseReason>,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Whether a tick at `price` satisfies the entry condition.
    ///
    /// Only meaningful while `Pending`; the engine checks status first.
    pub fn entry_met(&self, price: Price) -> bool {
        match self.side {
            OrderSide::Long => price >= self.entry_price,
            OrderSide::Short => price <= self.entry_price,
        }
    }

    /// Whether a tick at `price` satisfies an exit condition.
    ///
    /// Returns the reason of the level that was hit. With both levels set
    /// the bracket invariant makes them mutually exclusive for any single
    /// price. With neither set the order never auto-closes.
    pub fn exit_met(&self, price: Price) -> Option<CloseReason> {
        match self.side {
            OrderSide::Long => {
                if self.take_profit.is_some_and(|tp| price >= tp) {
                    return Some(CloseReason::TakeProfit);
                }
                if self.stop_loss.is_some_and(|sl| price <= sl) {
                    return Some(CloseReason::StopLoss);
                }
            }
            OrderSide::Short => {
                if self.take_profit.is_some_and(|tp| price <= tp) {
                    return Some(CloseReason::TakeProfit);
                }
                if self.stop_loss.is_some_and(|sl| price >= sl) {
                    return Some(CloseReason::StopLoss);
                }
            }
        }
        None
    }

    /// Transition Pending -> Open.
    pub fn mark_open(&mut self, now: DateTime<Utc>) {
        debug_assert_eq!(self.status, OrderStatus::Pending);
        self.status = OrderStatus::Open;
        self.executed_at = Some(now);
    }

    /// Transition to the terminal Closed state.
    pub fn mark_closed(&mut self, reason: CloseReason, now: DateTime<Utc>) {
        debug_assert!(self.status.is_active());
        self.status = OrderStatus::Closed;
        self.close_reason = Some(reason);
        self.closed_at = Some(now);
    }
}
