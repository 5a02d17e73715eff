//! Core domain types for the tradewatch trigger service.
//!
//! This crate provides the fundamental types used throughout the system:
//! - `Price`, `Size`: precision-safe numeric types
//! - `Order`: a conditional order and its lifecycle state machine
//! - `PriceTick`, `TriggerEvent`: the tick-in / event-out pair the engine
//!   consumes and produces

pub mod decimal;
pub mod error;
pub mod event;
pub mod order;

pub use decimal::{Price, Size};
pub use error::{OrderError, Result};
pub use event::{PriceTick, TriggerEvent};
pub use order::{CloseReason, Order, OrderDraft, OrderId, OrderSide, OrderStatus};
