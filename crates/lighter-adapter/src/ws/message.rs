/*
[INPUT]:  Raw JSON text frames and subscription intents
[OUTPUT]: Control frames, channel keys, and decoded order book / account events
[POS]:    WebSocket layer - wire format encoding and decoding
[UPDATE]: When adding new message kinds or changing frame format
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::http::{LighterError, Result};
use crate::types::PriceLevel;

/// Message `type` values seen on the stream
pub mod kinds {
    pub const SUBSCRIBE: &str = "subscribe";
    pub const UNSUBSCRIBE: &str = "unsubscribe";
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    pub const CONNECTED: &str = "connected";
    pub const SUBSCRIBED: &str = "subscribed";
    pub const UNSUBSCRIBED: &str = "unsubscribed";

    pub const ORDER_BOOK_SNAPSHOT: &str = "subscribed/order_book";
    pub const ORDER_BOOK_UPDATE: &str = "update/order_book";
    pub const ACCOUNT_SNAPSHOT: &str = "subscribed/account_all";
    pub const ACCOUNT_UPDATE: &str = "update/account_all";
}

/// Named data feed offered by the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    OrderBook,
    AccountAll,
    Ticker,
    Trades,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::OrderBook => "order_book",
            ChannelKind::AccountAll => "account_all",
            ChannelKind::Ticker => "ticker",
            ChannelKind::Trades => "trades",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = LighterError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "order_book" => Ok(ChannelKind::OrderBook),
            "account_all" => Ok(ChannelKind::AccountAll),
            "ticker" => Ok(ChannelKind::Ticker),
            "trades" => Ok(ChannelKind::Trades),
            other => Err(LighterError::Protocol(format!("unknown channel {other}"))),
        }
    }
}

/// Identity of one subscription: channel kind plus optional instrument id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey {
    pub kind: ChannelKind,
    pub instrument: Option<String>,
}

impl ChannelKey {
    pub fn new(kind: ChannelKind, instrument: Option<String>) -> Self {
        Self { kind, instrument }
    }

    pub fn order_book(market_id: u8) -> Self {
        Self::new(ChannelKind::OrderBook, Some(market_id.to_string()))
    }

    pub fn account_all(account_id: i64) -> Self {
        Self::new(ChannelKind::AccountAll, Some(account_id.to_string()))
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instrument {
            Some(instrument) => write!(f, "{}:{}", self.kind, instrument),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Outbound (and echoed) protocol bookkeeping frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl ControlFrame {
    pub fn subscribe(key: &ChannelKey) -> Self {
        Self::for_channel(kinds::SUBSCRIBE, key)
    }

    pub fn unsubscribe(key: &ChannelKey) -> Self {
        Self::for_channel(kinds::UNSUBSCRIBE, key)
    }

    pub fn ping() -> Self {
        Self::bare(kinds::PING)
    }

    pub fn pong() -> Self {
        Self::bare(kinds::PONG)
    }

    fn bare(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            channel: None,
            symbol: None,
        }
    }

    fn for_channel(kind: &str, key: &ChannelKey) -> Self {
        Self {
            kind: kind.to_string(),
            channel: Some(key.kind.as_str().to_string()),
            symbol: key.instrument.clone(),
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Channel key addressed by a subscribe/unsubscribe frame
    pub fn channel_key(&self) -> Result<ChannelKey> {
        let channel = self
            .channel
            .as_deref()
            .ok_or_else(|| LighterError::Protocol(format!("{} frame without channel", self.kind)))?;
        Ok(ChannelKey::new(channel.parse()?, self.symbol.clone()))
    }
}

/// Generic inbound envelope: message kind plus any embedded status
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InboundEnvelope {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl InboundEnvelope {
    /// Nonzero embedded code, from either a nested `error` object or a top-level `code`
    pub fn error(&self) -> Option<(i64, String)> {
        if let Some(body) = self.error.as_ref().filter(|body| body.code != 0) {
            return Some((body.code, body.message.clone()));
        }
        match self.code {
            Some(code) if code != 0 => Some((code, self.message.clone().unwrap_or_default())),
            _ => None,
        }
    }
}

/// Normalized order book delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBookEvent {
    pub market_id: u8,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub offset: i64,
    pub timestamp: i64,
    /// True for the full book sent on subscription, false for incremental updates
    pub is_snapshot: bool,
}

#[derive(Debug, Deserialize)]
struct OrderBookFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    order_book: Option<RawBook>,
    #[serde(default)]
    bids: Vec<RawLevel>,
    #[serde(default)]
    asks: Vec<RawLevel>,
    #[serde(default)]
    offset: i64,
    #[serde(default)]
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct RawBook {
    #[serde(default)]
    bids: Vec<RawLevel>,
    #[serde(default)]
    asks: Vec<RawLevel>,
    #[serde(default)]
    offset: i64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLevel {
    Pair(Vec<String>),
    Object {
        price: String,
        #[serde(alias = "quantity")]
        size: String,
    },
}

fn normalize_levels(side: &'static str, raw: Vec<RawLevel>) -> Vec<PriceLevel> {
    let mut levels = Vec::with_capacity(raw.len());
    for (index, level) in raw.into_iter().enumerate() {
        match level {
            RawLevel::Object { price, size } => levels.push(PriceLevel::new(price, size)),
            RawLevel::Pair(mut pair) if pair.len() >= 2 => {
                pair.truncate(2);
                let quantity = pair.pop().unwrap_or_default();
                let price = pair.pop().unwrap_or_default();
                levels.push(PriceLevel::new(price, quantity));
            }
            RawLevel::Pair(pair) => {
                warn!(side, index, len = pair.len(), "order book level too short, skipping");
            }
        }
    }
    levels
}

/// Instrument suffix of a frame channel such as `order_book:3` or `account_all/42`
pub(crate) fn channel_instrument(channel: &str) -> Option<&str> {
    channel
        .split_once(':')
        .or_else(|| channel.split_once('/'))
        .map(|(_, instrument)| instrument)
        .filter(|instrument| !instrument.is_empty())
}

impl OrderBookEvent {
    /// Decode a snapshot or update frame for `market_id`.
    ///
    /// Returns `Ok(None)` when the frame's channel names a different market.
    pub fn decode(raw: &str, market_id: u8) -> Result<Option<Self>> {
        let frame: OrderBookFrame = serde_json::from_str(raw)?;

        if let Some(instrument) = frame.channel.as_deref().and_then(channel_instrument) {
            if instrument != market_id.to_string() {
                return Ok(None);
            }
        }

        let is_snapshot = frame.kind.starts_with(kinds::SUBSCRIBED);
        let (bids, asks, offset) = match frame.order_book {
            Some(book) => (book.bids, book.asks, book.offset),
            None => (frame.bids, frame.asks, frame.offset),
        };

        Ok(Some(Self {
            market_id,
            bids: normalize_levels("bid", bids),
            asks: normalize_levels("ask", asks),
            offset,
            timestamp: frame.timestamp,
            is_snapshot,
        }))
    }
}

/// Account state delivery; the payload is passed through untouched
#[derive(Debug, Clone, PartialEq)]
pub struct AccountEvent {
    pub account_id: i64,
    pub is_snapshot: bool,
    pub timestamp: i64,
    pub payload: Value,
}

impl AccountEvent {
    /// Decode a snapshot or update frame for `account_id`.
    ///
    /// Returns `Ok(None)` when the frame belongs to another account.
    pub fn decode(raw: &str, account_id: i64) -> Result<Option<Self>> {
        let payload: Value = serde_json::from_str(raw)?;
        let kind = payload
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| LighterError::Protocol("account frame without type".to_string()))?;
        let is_snapshot = kind.starts_with(kinds::SUBSCRIBED);

        let frame_account = payload
            .get("account")
            .and_then(Value::as_i64)
            .or_else(|| {
                payload
                    .get("channel")
                    .and_then(Value::as_str)
                    .and_then(channel_instrument)
                    .and_then(|instrument| instrument.parse().ok())
            });
        if frame_account.is_some_and(|id| id != account_id) {
            return Ok(None);
        }

        let timestamp = payload.get("timestamp").and_then(Value::as_i64).unwrap_or_default();

        Ok(Some(Self {
            account_id,
            is_snapshot,
            timestamp,
            payload,
        }))
    }
}
