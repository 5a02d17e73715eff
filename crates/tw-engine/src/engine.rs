//! Tick-driven trigger evaluation.
//!
//! Monitoring is driven centrally by the tick stream. There is no
//! per-order timer: every tick evaluates the matching symbol partition
//! once, under one lock, against a consistent snapshot of the working set.

use crate::error::{EngineError, EngineResult};
use crate::working_set::WorkingSet;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tw_core::{
    CloseReason, Order, OrderDraft, OrderError, OrderId, OrderStatus, PriceTick, TriggerEvent,
};
use tw_notify::NotificationHub;
use tw_registry::SubscriptionRegistry;
use tw_store::{OrderStore, StoreError};
use tw_telemetry::Metrics;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Attempts per persistence write.
    pub persist_retry_attempts: u32,
    /// Initial backoff between attempts; doubles per retry.
    pub persist_retry_backoff_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            persist_retry_attempts: 3,
            persist_retry_backoff_ms: 250,
        }
    }
}

/// One decided transition, recorded while the working-set lock is held.
struct Transition {
    snapshot: Order,
    from: OrderStatus,
    reason: Option<CloseReason>,
}

/// The order trigger engine.
///
/// Owns the working set of active orders. Submission, manual closure and
/// tick evaluation all serialize on the single working-set lock;
/// persistence writes are dispatched to a writer task so the tick path
/// never waits on the store.
pub struct TriggerEngine {
    working_set: Mutex<WorkingSet>,
    store: Arc<dyn OrderStore>,
    registry: Arc<SubscriptionRegistry>,
    hub: Arc<NotificationHub>,
    /// Ordered persistence queue; a single writer preserves write order
    /// per order across transitions.
    persist_tx: mpsc::UnboundedSender<Order>,
}

impl TriggerEngine {
    /// Create the engine and spawn its persistence writer task.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(
        store: Arc<dyn OrderStore>,
        registry: Arc<SubscriptionRegistry>,
        hub: Arc<NotificationHub>,
        config: EngineConfig,
    ) -> Self {
        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        tokio::spawn(persist_writer(store.clone(), persist_rx, config));

        Self {
            working_set: Mutex::new(WorkingSet::new()),
            store,
            registry,
            hub,
            persist_tx,
        }
    }

    /// Load every pending and open order from the store into the working
    /// set and subscribe their symbols.
    ///
    /// Called once at startup, before any tick is consumed. The persisted
    /// status is the source of truth here.
    pub async fn load_active(&self) -> EngineResult<usize> {
        let mut orders = self.store.list_by_status(OrderStatus::Pending).await?;
        orders.extend(self.store.list_by_status(OrderStatus::Open).await?);

        let count = orders.len();
        for order in orders {
            self.registry.on_order_created(&order).await;
            self.working_set.lock().insert(order);
        }

        info!(count, "Recovered active orders from store");
        Ok(count)
    }

    /// Validate and accept a new order submission.
    ///
    /// The order is persisted before it enters the working set; a store
    /// failure rejects the submission outright.
    pub async fn submit(&self, draft: OrderDraft) -> EngineResult<Order> {
        let order = draft.into_order(Utc::now())?;
        self.store.create(&order).await?;

        self.working_set.lock().insert(order.clone());
        self.registry.on_order_created(&order).await;

        let count = self.working_set.lock().symbol_count(&order.symbol);
        Metrics::active_orders(&order.symbol, count as f64);

        debug!(
            order_id = %order.id,
            symbol = %order.symbol,
            side = %order.side,
            entry = %order.entry_price,
            "Order accepted"
        );
        Ok(order)
    }

    /// Manually close an order (pending or open).
    ///
    /// Driven by the external API, not by ticks. The transition still
    /// emits a trigger event so the owner's other live sessions see it.
    pub async fn close_order(&self, id: &OrderId) -> EngineResult<Order> {
        let removed = {
            let mut set = self.working_set.lock();
            let symbol = set.find(id).map(|o| o.symbol.clone());
            symbol.and_then(|s| set.remove(&s, id))
        };

        let Some(mut order) = removed else {
            return Err(self.describe_missing(id).await);
        };

        let now = Utc::now();
        let from = order.status;
        order.mark_closed(CloseReason::Manual, now);
        self.dispatch_persist(order.clone());
        self.registry.on_order_closed(&order).await;

        let count = self.working_set.lock().symbol_count(&order.symbol);
        Metrics::active_orders(&order.symbol, count as f64);
        Metrics::transition("closed", "manual");

        let event = TriggerEvent {
            order_id: order.id.clone(),
            owner_id: order.owner_id.clone(),
            symbol: order.symbol.clone(),
            from_status: from,
            to_status: order.status,
            // No tick involved; the entry level stands in for the price.
            price: order.entry_price,
            reason: Some(CloseReason::Manual),
            occurred_at: now,
        };
        if !self.hub.publish(&event) {
            Metrics::notification_dropped();
        }

        info!(order_id = %order.id, symbol = %order.symbol, "Order closed manually");
        Ok(order)
    }

    /// Why a close failed: already closed, or genuinely unknown.
    async fn describe_missing(&self, id: &OrderId) -> EngineError {
        match self.store.get(id).await {
            Ok(order) if order.status.is_terminal() => {
                OrderError::AlreadyClosed(id.to_string()).into()
            }
            Ok(_) => {
                // Persisted as active but absent from the working set:
                // recovery has not seen it, treat as unknown to the engine.
                warn!(order_id = %id, "Active order in store but not in working set");
                OrderError::NotFound(id.to_string()).into()
            }
            Err(StoreError::NotFound(_)) => OrderError::NotFound(id.to_string()).into(),
            Err(e) => e.into(),
        }
    }

    /// Evaluate one tick against the matching symbol partition.
    ///
    /// Returns the trigger events that fired, in transition order. An
    /// order whose entry fires is evaluated for exit on the same tick, so
    /// a single tick can carry Pending -> Open -> Closed as two explicit
    /// transitions with two events.
    pub async fn on_tick(&self, tick: &PriceTick) -> Vec<TriggerEvent> {
        let now = Utc::now();
        let mut transitions: Vec<Transition> = Vec::new();
        let remaining;

        {
            let mut set = self.working_set.lock();
            let Some(partition) = set.partition_mut(&tick.symbol) else {
                return Vec::new();
            };

            let mut closed: Vec<OrderId> = Vec::new();
            for order in partition.values_mut() {
                if order.status == OrderStatus::Pending && order.entry_met(tick.price) {
                    order.mark_open(now);
                    transitions.push(Transition {
                        snapshot: order.clone(),
                        from: OrderStatus::Pending,
                        reason: None,
                    });
                }

                if order.status == OrderStatus::Open {
                    if let Some(reason) = order.exit_met(tick.price) {
                        order.mark_closed(reason, now);
                        transitions.push(Transition {
                            snapshot: order.clone(),
                            from: OrderStatus::Open,
                            reason: Some(reason),
                        });
                        closed.push(order.id.clone());
                    }
                }
            }

            for id in &closed {
                set.remove(&tick.symbol, id);
            }
            remaining = set.symbol_count(&tick.symbol);
        }

        if transitions.is_empty() {
            return Vec::new();
        }

        Metrics::active_orders(&tick.symbol, remaining as f64);

        // One write per order per tick: the later transition supersedes
        // the earlier one for an order that opened and closed together.
        let mut final_states: Vec<(OrderId, Order)> = Vec::new();
        for t in &transitions {
            match final_states.iter_mut().find(|(id, _)| *id == t.snapshot.id) {
                Some((_, existing)) => *existing = t.snapshot.clone(),
                None => final_states.push((t.snapshot.id.clone(), t.snapshot.clone())),
            }
        }
        for (_, order) in final_states {
            self.dispatch_persist(order);
        }

        let mut events = Vec::with_capacity(transitions.len());
        for t in transitions {
            let event = TriggerEvent {
                order_id: t.snapshot.id.clone(),
                owner_id: t.snapshot.owner_id.clone(),
                symbol: t.snapshot.symbol.clone(),
                from_status: t.from,
                to_status: t.snapshot.status,
                price: tick.price,
                reason: t.reason,
                occurred_at: now,
            };

            match t.snapshot.status {
                OrderStatus::Open => {
                    Metrics::transition("open", "entry");
                    info!(
                        order_id = %event.order_id,
                        symbol = %event.symbol,
                        price = %event.price,
                        "Entry triggered"
                    );
                }
                OrderStatus::Closed => {
                    let reason = t.reason.map(|r| r.to_string()).unwrap_or_default();
                    Metrics::transition("closed", &reason);
                    info!(
                        order_id = %event.order_id,
                        symbol = %event.symbol,
                        price = %event.price,
                        %reason,
                        "Exit triggered"
                    );
                    self.registry.on_order_closed(&t.snapshot).await;
                }
                OrderStatus::Pending => unreachable!("transitions never target Pending"),
            }

            if !self.hub.publish(&event) {
                Metrics::notification_dropped();
            }
            events.push(event);
        }

        events
    }

    /// Active orders currently tracked for a symbol.
    pub fn active_count(&self, symbol: &str) -> usize {
        self.working_set.lock().symbol_count(symbol)
    }

    /// Total active orders in the working set.
    pub fn working_set_size(&self) -> usize {
        self.working_set.lock().len()
    }

    /// Queue a state write. Never blocks the caller; the in-memory status
    /// is already authoritative when this is called.
    fn dispatch_persist(&self, order: Order) {
        if self.persist_tx.send(order).is_err() {
            // Writer task gone; only possible during shutdown.
            warn!("Persistence writer unavailable, state write dropped");
            Metrics::persist_failure();
        }
    }
}

/// Single persistence writer.
///
/// Consumes decided transitions in order and writes each with bounded
/// retry. An exhausted write leaves the in-memory status authoritative;
/// it is never reverted, since the trigger event may already be out.
async fn persist_writer(
    store: Arc<dyn OrderStore>,
    mut rx: mpsc::UnboundedReceiver<Order>,
    config: EngineConfig,
) {
    while let Some(order) = rx.recv().await {
        persist_with_retry(store.as_ref(), &order, &config).await;
    }
    debug!("Persistence writer stopped");
}

async fn persist_with_retry(store: &dyn OrderStore, order: &Order, config: &EngineConfig) {
    let mut delay = Duration::from_millis(config.persist_retry_backoff_ms);

    for attempt in 1..=config.persist_retry_attempts.max(1) {
        match store.update(order).await {
            Ok(()) => {
                if attempt > 1 {
                    debug!(order_id = %order.id, attempt, "State write succeeded after retry");
                }
                return;
            }
            Err(e) => {
                warn!(
                    order_id = %order.id,
                    attempt,
                    ?e,
                    "State write failed"
                );
                if attempt < config.persist_retry_attempts {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }

    // Durability warning: the transition stands in memory for the rest of
    // the process lifetime even though the store disagrees.
    error!(
        order_id = %order.id,
        status = %order.status,
        "State write exhausted retries; in-memory status remains authoritative"
    );
    Metrics::persist_failure();
}
