//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Malformed frame: {0}")]
    Malformed(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),
}

pub type FeedResult<T> = Result<T, FeedError>;
