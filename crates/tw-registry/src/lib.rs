//! Derived subscription registry.
//!
//! Keeps the feed's subscriptions exactly equal to "symbols with at least
//! one pending or open order".

pub mod registry;

pub use registry::SubscriptionRegistry;
