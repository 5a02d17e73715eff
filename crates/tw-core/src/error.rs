//! Error types for tw-core.

use thiserror::Error;

/// Order validation and lifecycle errors.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Invalid owner: {0}")]
    InvalidOwner(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid sizing: {0}")]
    InvalidSizing(String),

    #[error("Exit levels do not bracket entry: {0}")]
    BracketViolation(String),

    #[error("Order already closed: {0}")]
    AlreadyClosed(String),

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, OrderError>;
