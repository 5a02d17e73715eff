//! Per-user trigger event fan-out.

pub mod hub;

pub use hub::{NotificationHub, Subscription};
