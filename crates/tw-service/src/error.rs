//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tw_ws::WsError>),

    #[error("Feed error: {0}")]
    Feed(#[from] tw_feed::FeedError),

    #[error("Engine error: {0}")]
    Engine(#[from] tw_engine::EngineError),

    #[error("Store error: {0}")]
    Store(#[from] tw_store::StoreError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] tw_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
