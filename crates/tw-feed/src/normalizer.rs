//! Frame normalization for the venue's ticker channel.
//!
//! Inbound ticker frames look like:
//!
//! ```json
//! {
//!   "action": "snapshot",
//!   "arg": {"instType": "USDT-FUTURES", "channel": "ticker", "instId": "BTCUSDT"},
//!   "data": [{"instId": "BTCUSDT", "lastPr": "27000.5", "ts": "1695715383021"}]
//! }
//! ```
//!
//! Older deployments name the price field `last` instead of `lastPr`; both
//! are accepted. Subscription acks arrive as `{"event": "subscribe", ...}`
//! frames and are skipped.

use crate::error::{FeedError, FeedResult};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use tw_core::{Price, PriceTick};

/// Normalization counters.
#[derive(Debug, Default)]
pub struct NormalizerStats {
    /// Ticks produced.
    pub ticks: AtomicU64,
    /// Frames skipped as control/unknown.
    pub skipped: AtomicU64,
    /// Frames rejected as malformed.
    pub malformed: AtomicU64,
}

impl NormalizerStats {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }
}

/// One entry of a ticker frame's `data` array.
#[derive(Debug, Deserialize)]
struct TickerEntry {
    #[serde(rename = "instId", default)]
    inst_id: Option<String>,
    #[serde(rename = "lastPr", default)]
    last_pr: Option<serde_json::Value>,
    #[serde(rename = "last", default)]
    last: Option<serde_json::Value>,
    #[serde(default)]
    ts: Option<serde_json::Value>,
}

/// Raw frame -> `PriceTick` normalizer.
pub struct TickNormalizer {
    stats: NormalizerStats,
}

impl TickNormalizer {
    pub fn new() -> Self {
        Self {
            stats: NormalizerStats::default(),
        }
    }

    pub fn stats(&self) -> &NormalizerStats {
        &self.stats
    }

    /// Normalize one raw text frame.
    ///
    /// Returns `Ok(None)` for control frames and channels this system does
    /// not consume. Returns `Err` for malformed frames; the caller logs
    /// and skips, one bad frame never affects anything else.
    pub fn normalize(&self, text: &str) -> FeedResult<Option<PriceTick>> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
            self.stats.malformed.fetch_add(1, Ordering::Relaxed);
            FeedError::Malformed(format!("not JSON: {e}"))
        })?;

        // Control frames: subscription acks and venue errors.
        if let Some(event) = value.get("event").and_then(|v| v.as_str()) {
            match event {
                "subscribe" | "unsubscribe" => {
                    debug!(event, arg = ?value.get("arg"), "Subscription ack");
                }
                "error" => {
                    warn!(
                        code = ?value.get("code"),
                        msg = ?value.get("msg"),
                        "Feed error frame"
                    );
                }
                other => {
                    debug!(event = other, "Unhandled event frame");
                }
            }
            self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        let channel = value
            .pointer("/arg/channel")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if channel != "ticker" {
            debug!(channel, "Non-ticker frame, skipping");
            self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        let entry_value = value
            .pointer("/data/0")
            .cloned()
            .ok_or_else(|| self.malformed_field("data[0]"))?;
        let entry: TickerEntry = serde_json::from_value(entry_value)
            .map_err(|e| self.malformed_frame(format!("ticker entry: {e}")))?;

        let symbol = value
            .pointer("/arg/instId")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| entry.inst_id.clone())
            .ok_or_else(|| self.malformed_field("instId"))?;

        let price_raw = entry
            .last_pr
            .as_ref()
            .or(entry.last.as_ref())
            .ok_or_else(|| self.malformed_field("lastPr"))?;
        let price = parse_price(price_raw).map_err(|e| {
            self.stats.malformed.fetch_add(1, Ordering::Relaxed);
            e
        })?;

        let observed_at = entry
            .ts
            .as_ref()
            .and_then(parse_millis)
            .or_else(|| value.get("ts").and_then(parse_millis))
            .unwrap_or_else(Utc::now);

        self.stats.ticks.fetch_add(1, Ordering::Relaxed);
        debug!(%symbol, %price, "Tick");
        Ok(Some(PriceTick::new(symbol, price, observed_at)))
    }

    fn malformed_field(&self, field: &str) -> FeedError {
        self.stats.malformed.fetch_add(1, Ordering::Relaxed);
        FeedError::MissingField(field.to_string())
    }

    fn malformed_frame(&self, msg: String) -> FeedError {
        self.stats.malformed.fetch_add(1, Ordering::Relaxed);
        FeedError::Malformed(msg)
    }
}

impl Default for TickNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// The venue sends prices as strings; numbers are tolerated.
fn parse_price(value: &serde_json::Value) -> FeedResult<Price> {
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        other => {
            return Err(FeedError::InvalidPrice(format!("{other}")));
        }
    };
    let d: Decimal = text
        .parse()
        .map_err(|_| FeedError::InvalidPrice(text.clone()))?;
    if d <= Decimal::ZERO {
        return Err(FeedError::InvalidPrice(format!("non-positive: {d}")));
    }
    Ok(Price::new(d))
}

/// Millisecond timestamps arrive as strings or numbers.
fn parse_millis(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    let millis = match value {
        serde_json::Value::String(s) => s.parse::<i64>().ok()?,
        serde_json::Value::Number(n) => n.as_i64()?,
        _ => return None,
    };
    Utc.timestamp_millis_opt(millis).single()
}
