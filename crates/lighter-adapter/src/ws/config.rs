/*
[INPUT]:  Stream endpoint and timing preferences
[OUTPUT]: WsConfig consumed by the connection manager
[POS]:    WebSocket layer - connection configuration
[UPDATE]: When adding connection options or changing timing defaults
*/

use std::time::Duration;

use crate::http::{LighterError, Result};

/// Mainnet streaming endpoint
pub const DEFAULT_WS_URL: &str = "wss://mainnet.zklighter.elliot.ai/stream";

/// WebSocket connection configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    pub url: String,
    pub handshake_timeout: Duration,
    /// Interval between JSON `ping` frames; must be non-zero
    pub ping_interval: Duration,
    /// Refreshed on every receive
    pub read_timeout: Duration,
    /// Applied to each send
    pub write_timeout: Duration,
    /// Spacing between replayed `subscribe` frames after a reconnect
    pub resubscribe_delay: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            handshake_timeout: Duration::from_secs(45),
            ping_interval: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
            resubscribe_delay: Duration::from_millis(100),
        }
    }
}

impl WsConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Reject settings the background loops cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(LighterError::Config("ws url is empty".to_string()));
        }
        if self.ping_interval.is_zero() {
            return Err(LighterError::Config("ping_interval must be non-zero".to_string()));
        }
        Ok(())
    }
}
