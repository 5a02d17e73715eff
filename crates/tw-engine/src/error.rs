//! Engine error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Order error: {0}")]
    Order(#[from] tw_core::OrderError),

    #[error("Store error: {0}")]
    Store(#[from] tw_store::StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;
