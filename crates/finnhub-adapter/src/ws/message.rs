/*
[INPUT]:  Raw WebSocket message bytes
[OUTPUT]: Parsed stream frames and outbound subscription commands
[POS]:    WebSocket layer - message parsing and validation
[UPDATE]: When adding new message types or changing format
*/

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One streamed trade tick.
///
/// Vendor schema: `s` symbol, `p` last price, `v` volume, `t` unix
/// timestamp in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTick {
    pub s: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub p: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub v: Option<Decimal>,
    pub t: i64,
}

/// Server-to-client stream frames
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum StreamMessage {
    #[serde(rename = "trade")]
    Trade { data: Vec<TradeTick> },
    #[serde(rename = "ping")]
    Ping,
    /// Synthesized locally when the socket pump exits; never on the wire.
    #[serde(skip)]
    Disconnected,
    #[serde(other)]
    Other,
}

/// Client-to-server subscription frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamCommand {
    #[serde(rename = "subscribe")]
    Subscribe { symbol: String },
    #[serde(rename = "unsubscribe")]
    Unsubscribe { symbol: String },
}

impl StreamCommand {
    pub fn symbol(&self) -> &str {
        match self {
            StreamCommand::Subscribe { symbol } | StreamCommand::Unsubscribe { symbol } => symbol,
        }
    }
}
