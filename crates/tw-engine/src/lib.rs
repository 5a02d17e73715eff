//! The order trigger engine.
//!
//! Holds the working set of pending/open orders, evaluates each incoming
//! tick against the matching symbol partition, performs the
//! Pending -> Open -> Closed transitions, persists them, and emits trigger
//! events.

pub mod engine;
pub mod error;
pub mod working_set;

pub use engine::{EngineConfig, TriggerEngine};
pub use error::{EngineError, EngineResult};
pub use working_set::WorkingSet;
