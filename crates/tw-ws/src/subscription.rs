//! The active subscription set.
//!
//! Holds the symbols the transport should be subscribed to. The set is the
//! source of truth across reconnects: every successful connect replays it
//! in full rather than assuming the venue kept server-side state. A symbol
//! added while disconnected is therefore "queued" simply by being in the
//! set.

use parking_lot::RwLock;
use std::collections::BTreeSet;

/// Set of symbols the feed should currently deliver ticks for.
#[derive(Default)]
pub struct SubscriptionSet {
    symbols: RwLock<BTreeSet<String>>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol. Returns false if it was already present (no-op).
    pub fn insert(&self, symbol: &str) -> bool {
        self.symbols.write().insert(symbol.to_string())
    }

    /// Remove a symbol. Returns false if it was not present (no-op).
    pub fn remove(&self, symbol: &str) -> bool {
        self.symbols.write().remove(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.read().contains(symbol)
    }

    /// Snapshot of the set, in deterministic order (replay order).
    pub fn symbols(&self) -> Vec<String> {
        self.symbols.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.symbols.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.read().is_empty()
    }
}
