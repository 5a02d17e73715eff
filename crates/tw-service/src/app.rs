//! Main application orchestration.
//!
//! Wires the components together and runs the event loop:
//! raw frames from the transport -> normalizer -> trigger engine,
//! with trigger events fanning out through the notification hub.

use crate::config::AppConfig;
use crate::error::AppResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tw_core::{Order, OrderDraft, OrderId};
use tw_engine::{EngineResult, TriggerEngine};
use tw_feed::TickNormalizer;
use tw_notify::{NotificationHub, Subscription};
use tw_registry::SubscriptionRegistry;
use tw_store::OrderStore;
use tw_telemetry::Metrics;
use tw_ws::{ConnectionManager, ConnectionState};

/// Connection status gauge refresh interval.
const STATUS_INTERVAL: Duration = Duration::from_secs(60);

/// Main application.
pub struct Application {
    engine: Arc<TriggerEngine>,
    hub: Arc<NotificationHub>,
    connection: Arc<ConnectionManager>,
    frame_rx: mpsc::Receiver<String>,
    normalizer: TickNormalizer,
}

impl Application {
    /// Wire up the streaming core around the given store.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(config: AppConfig, store: Arc<dyn OrderStore>) -> Self {
        let (frame_tx, frame_rx) = mpsc::channel::<String>(1000);

        let connection = Arc::new(ConnectionManager::new(config.feed.clone().into(), frame_tx));
        let registry = Arc::new(SubscriptionRegistry::new(connection.handle()));
        let hub = Arc::new(NotificationHub::new(config.notify.observer_buffer));
        let engine = Arc::new(TriggerEngine::new(
            store,
            registry,
            hub.clone(),
            config.engine.clone().into(),
        ));

        Self {
            engine,
            hub,
            connection,
            frame_rx,
            normalizer: TickNormalizer::new(),
        }
    }

    /// Handle for the external API plumbing (order submission, manual
    /// closure, observer registration).
    pub fn handle(&self) -> AppHandle {
        AppHandle {
            engine: self.engine.clone(),
            hub: self.hub.clone(),
        }
    }

    /// Run the application until a shutdown signal.
    pub async fn run(mut self) -> AppResult<()> {
        // Startup recovery before any tick is consumed: the working set
        // and the subscription set come up together.
        let recovered = self.engine.load_active().await?;
        info!(recovered, "Starting trigger service");

        let connection = self.connection.clone();
        let ws_handle = tokio::spawn(async move {
            if let Err(e) = connection.connect().await {
                error!(?e, "Feed connection task ended with error");
            }
        });

        let mut status_interval = tokio::time::interval(STATUS_INTERVAL);

        loop {
            tokio::select! {
                Some(frame) = self.frame_rx.recv() => {
                    self.handle_frame(&frame).await;
                }

                _ = status_interval.tick() => {
                    self.report_status();
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.connection.shutdown();
        let _ = ws_handle.await;

        let stats = self.normalizer.stats();
        info!(
            ticks = stats.ticks(),
            skipped = stats.skipped(),
            malformed = stats.malformed(),
            "Shut down"
        );
        Ok(())
    }

    /// Normalize one raw frame and evaluate the tick.
    ///
    /// A malformed frame is logged and skipped; it never affects the
    /// connection or other orders.
    async fn handle_frame(&self, frame: &str) {
        match self.normalizer.normalize(frame) {
            Ok(Some(tick)) => {
                Metrics::tick_processed(&tick.symbol);
                let events = self.engine.on_tick(&tick).await;
                if !events.is_empty() {
                    debug!(
                        symbol = %tick.symbol,
                        price = %tick.price,
                        count = events.len(),
                        "Tick produced transitions"
                    );
                }
            }
            Ok(None) => {
                Metrics::frame_skipped();
            }
            Err(e) => {
                warn!(?e, "Malformed frame skipped");
                Metrics::frame_malformed();
            }
        }
    }

    fn report_status(&self) {
        let state = self.connection.state();
        match state {
            ConnectionState::Connected => Metrics::feed_connected(),
            _ => Metrics::feed_disconnected(),
        }
        debug!(
            %state,
            active_orders = self.engine.working_set_size(),
            observers = self.hub.observer_count(),
            "Status"
        );
    }
}

/// Clone-able handle exposing the core to the external collaborators.
#[derive(Clone)]
pub struct AppHandle {
    engine: Arc<TriggerEngine>,
    hub: Arc<NotificationHub>,
}

impl AppHandle {
    /// Submit a new conditional order.
    pub async fn submit_order(&self, draft: OrderDraft) -> EngineResult<Order> {
        self.engine.submit(draft).await
    }

    /// Manually close an order.
    pub async fn close_order(&self, id: &OrderId) -> EngineResult<Order> {
        self.engine.close_order(id).await
    }

    /// Register a trigger event observer for an owner. The previous
    /// observer for the same owner, if any, is replaced.
    pub fn register_observer(&self, owner_id: &str) -> Subscription {
        self.hub.register(owner_id)
    }

    /// Remove an owner's observer if it still is the given registration.
    pub fn unregister_observer(&self, owner_id: &str, observer_id: u64) {
        self.hub.unregister_observer(owner_id, observer_id);
    }
}
