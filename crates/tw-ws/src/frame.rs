//! Outbound control frames and keepalive framing.
//!
//! The venue's subscribe/unsubscribe frames carry
//! `{channel: "ticker", instType, instId}`. Ping/pong framing varies
//! between deployments (plain string vs JSON object), so it is a
//! configuration property rather than a constant.

use serde::{Deserialize, Serialize};

/// Instrument class sent in subscription control frames.
pub const INST_TYPE: &str = "USDT-FUTURES";

/// The ticker channel name.
pub const TICKER_CHANNEL: &str = "ticker";

/// Keepalive framing variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PingFormat {
    /// Literal `ping` text frame.
    Text,
    /// `{"op":"ping"}` JSON frame.
    #[default]
    Json,
}

/// Build the keepalive ping frame.
pub fn ping_frame(format: PingFormat) -> String {
    match format {
        PingFormat::Text => "ping".to_string(),
        PingFormat::Json => serde_json::json!({ "op": "ping" }).to_string(),
    }
}

/// Whether an inbound text frame is a keepalive pong.
///
/// Accepts the literal `pong` text as well as `{"event":"pong"}` and
/// `{"op":"pong"}` JSON frames; the venue's framing varies.
pub fn is_pong(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("pong") {
        return true;
    }
    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return false;
    };
    ["event", "op"].iter().any(|key| {
        value
            .get(key)
            .and_then(|v| v.as_str())
            .is_some_and(|v| v == "pong")
    })
}

/// Build a ticker subscribe frame for one symbol.
pub fn subscribe_frame(symbol: &str) -> String {
    control_frame("subscribe", symbol)
}

/// Build a ticker unsubscribe frame for one symbol.
pub fn unsubscribe_frame(symbol: &str) -> String {
    control_frame("unsubscribe", symbol)
}

fn control_frame(op: &str, symbol: &str) -> String {
    serde_json::json!({
        "op": op,
        "args": [{
            "instType": INST_TYPE,
            "channel": TICKER_CHANNEL,
            "instId": symbol,
        }]
    })
    .to_string()
}
