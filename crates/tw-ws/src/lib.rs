//! WebSocket transport for the market-data feed.
//!
//! Provides a long-lived streaming session with:
//! - Supervised reconnection with a fixed retry delay
//! - Replay of the active subscription set on every (re)connect
//! - Keepalive monitoring (periodic ping, grace-window staleness detection)
//! - A clone-able, reconnect-safe handle for subscribe/unsubscribe
//!
//! The transport forwards inbound text frames raw; it interprets nothing
//! beyond keepalive handshakes and connection control.

pub mod connection;
pub mod error;
pub mod frame;
pub mod handle;
pub mod keepalive;
pub mod subscription;

pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState};
pub use error::{WsError, WsResult};
pub use frame::PingFormat;
pub use handle::FeedHandle;
pub use subscription::SubscriptionSet;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
