//! Feed connection manager.
//!
//! Owns the single outbound streaming connection: connect, subscription
//! replay, keepalive, disconnect detection, and supervised reconnection
//! with a fixed retry delay.

use crate::error::{WsError, WsResult};
use crate::frame::{is_pong, ping_frame, subscribe_frame, PingFormat};
use crate::handle::FeedHandle;
use crate::keepalive::Keepalive;
use crate::subscription::SubscriptionSet;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL of the venue's public feed.
    pub url: String,
    /// Maximum reconnection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Fixed delay between reconnection attempts.
    pub reconnect_delay_ms: u64,
    /// Keepalive ping interval.
    pub keepalive_interval_ms: u64,
    /// Grace window for the pong after a ping.
    pub keepalive_grace_ms: u64,
    /// Ping/pong framing variant.
    pub ping_format: PingFormat,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_reconnect_attempts: 0, // Infinite
            reconnect_delay_ms: 5000,
            keepalive_interval_ms: 30_000,
            keepalive_grace_ms: 35_000,
            ping_format: PingFormat::default(),
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// Feed connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    state: Arc<RwLock<ConnectionState>>,
    subscriptions: Arc<SubscriptionSet>,
    keepalive: Arc<Keepalive>,
    /// Raw inbound text frames, forwarded to the normalizer.
    frame_tx: mpsc::Sender<String>,
    reconnect_count: Arc<RwLock<u32>>,
    /// Outbound control-frame sender (held by FeedHandle clones).
    outbound_tx: mpsc::Sender<String>,
    /// Outbound receiver (consumed by the message loop).
    outbound_rx: Arc<TokioMutex<mpsc::Receiver<String>>>,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new(config: ConnectionConfig, frame_tx: mpsc::Sender<String>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(100);
        Self {
            keepalive: Arc::new(Keepalive::new(
                config.keepalive_interval_ms,
                config.keepalive_grace_ms,
            )),
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            subscriptions: Arc::new(SubscriptionSet::new()),
            frame_tx,
            reconnect_count: Arc::new(RwLock::new(0)),
            outbound_tx,
            outbound_rx: Arc::new(TokioMutex::new(outbound_rx)),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get a subscription handle.
    ///
    /// The handle can be cloned and shared across tasks; it stays valid
    /// across reconnects.
    pub fn handle(&self) -> FeedHandle {
        FeedHandle::new(
            self.outbound_tx.clone(),
            self.state.clone(),
            self.subscriptions.clone(),
        )
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Reconnection attempts since the last successful connect.
    pub fn reconnect_count(&self) -> u32 {
        *self.reconnect_count.read()
    }

    /// Signal graceful shutdown.
    pub fn shutdown(&self) {
        info!("Feed connection shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect and run the session loop until shutdown.
    ///
    /// Every disconnect (error, close, stale keepalive) is absorbed here:
    /// the loop waits the fixed delay and retries, replaying the active
    /// subscription set on the new connection.
    pub async fn connect(&self) -> WsResult<()> {
        let mut attempt = 0u32;

        loop {
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                *self.state.write() = ConnectionState::Disconnected;
                return Ok(());
            }

            *self.state.write() = ConnectionState::Connecting;

            match self.run_session().await {
                Ok(()) => {
                    info!("Feed connection closed");
                }
                Err(e) => {
                    error!(?e, "Feed connection error");
                }
            }

            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                *self.state.write() = ConnectionState::Disconnected;
                return Ok(());
            }

            attempt += 1;
            *self.reconnect_count.write() = attempt;

            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(attempt, "Max reconnection attempts reached");
                *self.state.write() = ConnectionState::Disconnected;
                return Err(WsError::ConnectionFailed(
                    "Max reconnection attempts reached".to_string(),
                ));
            }

            *self.state.write() = ConnectionState::Reconnecting;

            let delay = Duration::from_millis(self.config.reconnect_delay_ms);
            warn!(attempt, delay_ms = delay.as_millis(), "Reconnecting");

            // Cancellation-aware sleep so shutdown is not delayed.
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during reconnect delay, exiting");
                    *self.state.write() = ConnectionState::Disconnected;
                    return Ok(());
                }
            }
        }
    }

    async fn run_session(&self) -> WsResult<()> {
        info!(url = %self.config.url, "Connecting to feed");

        let (ws_stream, _response) =
            connect_async_tls_with_config(&self.config.url, None, true, None).await?;
        let (mut write, mut read) = ws_stream.split();

        *self.state.write() = ConnectionState::Connected;
        *self.reconnect_count.write() = 0;
        info!("Feed connected");

        // Replay the active set before any tick is consumed; the venue
        // does not persist subscriptions across connections.
        let symbols = self.subscriptions.symbols();
        info!(count = symbols.len(), "Replaying subscriptions");
        for symbol in &symbols {
            write.send(Message::Text(subscribe_frame(symbol))).await?;
        }

        self.keepalive.reset();

        loop {
            let outbound_recv = async { self.outbound_rx.lock().await.recv().await };

            tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(?e, "Failed to send Close frame during shutdown");
                    }
                    *self.state.write() = ConnectionState::Disconnected;
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_frame(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received ping, sending pong");
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            self.keepalive.record_pong();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Feed closed by server");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(?e, "Feed read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("Feed stream ended");
                            return Ok(());
                        }
                        _ => {}
                    }
                }

                outbound = outbound_recv => {
                    if let Some(frame) = outbound {
                        write.send(Message::Text(frame)).await?;
                    }
                }

                _ = self.keepalive.wait_for_check() => {
                    if self.keepalive.is_stale() {
                        error!("Keepalive grace window elapsed without pong");
                        return Err(WsError::KeepaliveTimeout);
                    }

                    if self.keepalive.should_send_ping() {
                        write
                            .send(Message::Text(ping_frame(self.config.ping_format)))
                            .await?;
                        self.keepalive.record_ping();
                        debug!("Sent keepalive ping");
                    }
                }
            }
        }
    }

    /// Route one inbound text frame.
    ///
    /// Pongs terminate here; everything else is forwarded raw. The
    /// transport never interprets payload semantics.
    async fn handle_text_frame(&self, text: &str) {
        self.keepalive.record_message();

        if is_pong(text) {
            debug!("Received application-level pong");
            self.keepalive.record_pong();
            return;
        }

        if self.frame_tx.send(text.to_string()).await.is_err() {
            warn!("Frame receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert_eq!(config.max_reconnect_attempts, 0); // Infinite
        assert_eq!(config.reconnect_delay_ms, 5000);
        assert_eq!(config.keepalive_interval_ms, 30_000);
        assert_eq!(config.keepalive_grace_ms, 35_000);
    }

    #[tokio::test]
    async fn test_handle_shares_subscription_set() {
        let (frame_tx, _frame_rx) = mpsc::channel(8);
        let manager = ConnectionManager::new(ConnectionConfig::default(), frame_tx);

        let handle = manager.handle();
        handle.subscribe("BTCUSDT").await;

        assert!(manager.subscriptions.contains("BTCUSDT"));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_pong_not_forwarded() {
        let (frame_tx, mut frame_rx) = mpsc::channel(8);
        let manager = ConnectionManager::new(ConnectionConfig::default(), frame_tx);

        manager.handle_text_frame(r#"{"event":"pong"}"#).await;
        manager.handle_text_frame(r#"{"event":"subscribe"}"#).await;

        let forwarded = frame_rx.recv().await.unwrap();
        assert!(forwarded.contains("subscribe"));
        assert!(frame_rx.try_recv().is_err());
    }
}
