//! Feed handle for subscription control.
//!
//! Clone-able, channel-based, reconnect-safe. Callers mutate the desired
//! subscription set through this handle; the connection manager owns the
//! socket and replays the set on every (re)connect.

use crate::connection::ConnectionState;
use crate::frame::{subscribe_frame, unsubscribe_frame};
use crate::subscription::SubscriptionSet;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Handle for driving the feed transport's subscriptions.
#[derive(Clone)]
pub struct FeedHandle {
    tx: mpsc::Sender<String>,
    state: Arc<RwLock<ConnectionState>>,
    subscriptions: Arc<SubscriptionSet>,
}

impl FeedHandle {
    pub(crate) fn new(
        tx: mpsc::Sender<String>,
        state: Arc<RwLock<ConnectionState>>,
        subscriptions: Arc<SubscriptionSet>,
    ) -> Self {
        Self {
            tx,
            state,
            subscriptions,
        }
    }

    /// Subscribe to ticker data for a symbol.
    ///
    /// No-op if the symbol is already in the desired set. When connected
    /// the control frame is sent immediately; otherwise the symbol sits in
    /// the set and is replayed on the next successful connect.
    pub async fn subscribe(&self, symbol: &str) {
        if !self.subscriptions.insert(symbol) {
            debug!(symbol, "Already subscribed, skipping");
            return;
        }
        if self.is_connected() {
            self.send_control(subscribe_frame(symbol)).await;
        } else {
            debug!(symbol, "Not connected, subscription queued for replay");
        }
    }

    /// Unsubscribe from ticker data for a symbol.
    ///
    /// No-op if the symbol is not in the desired set.
    pub async fn unsubscribe(&self, symbol: &str) {
        if !self.subscriptions.remove(symbol) {
            debug!(symbol, "Not subscribed, skipping");
            return;
        }
        if self.is_connected() {
            self.send_control(unsubscribe_frame(symbol)).await;
        }
    }

    async fn send_control(&self, frame: String) {
        if self.tx.send(frame).await.is_err() {
            // Connection task gone; the set still holds the desired state.
            warn!("Feed outbound channel closed, control frame dropped");
        }
    }

    /// Symbols currently in the desired set.
    pub fn active_symbols(&self) -> Vec<String> {
        self.subscriptions.symbols()
    }

    pub fn is_connected(&self) -> bool {
        *self.state.read() == ConnectionState::Connected && !self.tx.is_closed()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.read()
    }
}
