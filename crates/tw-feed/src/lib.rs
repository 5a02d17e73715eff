//! Ticker frame normalization.
//!
//! Turns raw feed frames into canonical `PriceTick`s. Control frames and
//! unknown channels are skipped; malformed frames are reported to the
//! caller for logging and never affect the connection or other orders.

pub mod error;
pub mod normalizer;

pub use error::{FeedError, FeedResult};
pub use normalizer::{NormalizerStats, TickNormalizer};
