/*
[INPUT]:  YAML configuration file
[OUTPUT]: Parsed and validated feed configuration
[POS]:    Configuration layer - stream setup
[UPDATE]: When adding new configuration options
*/

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use lighter_adapter::ws::{WsConfig, DEFAULT_WS_URL};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the feed runner
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    /// Stream endpoint
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Market ids whose order books are streamed
    #[serde(default)]
    pub markets: Vec<u8>,
    /// Accounts streamed over authenticated connections
    #[serde(default)]
    pub accounts: Vec<AccountStreamConfig>,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// One private account feed
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountStreamConfig {
    pub account_id: i64,
    /// Bearer token issued for this account
    pub auth_token: String,
}

/// Caller-side retry policy applied after a connection loss
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl ReconnectConfig {
    /// Delay before reconnect `attempt` (1-based): doubles from the base, capped at the max
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32);
        let millis = self.base_delay_ms.saturating_mul(1u64 << exp);
        Duration::from_millis(millis.min(self.max_delay_ms))
    }
}

fn default_ws_url() -> String {
    DEFAULT_WS_URL.to_string()
}

fn default_max_attempts() -> u32 {
    10
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl StreamConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("parse config yaml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ws_url.trim().is_empty() {
            bail!("ws_url must not be empty");
        }
        if self.markets.is_empty() && self.accounts.is_empty() {
            bail!("configure at least one market or account");
        }
        if let Some(account) = self.accounts.iter().find(|account| account.auth_token.trim().is_empty()) {
            bail!("account {} has an empty auth_token", account.account_id);
        }
        if self.reconnect.base_delay_ms > self.reconnect.max_delay_ms {
            bail!("reconnect.base_delay_ms exceeds reconnect.max_delay_ms");
        }
        Ok(())
    }

    pub fn ws_config(&self) -> WsConfig {
        WsConfig::default().with_url(self.ws_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let config = StreamConfig::from_yaml("markets: [0, 3]\n").expect("config");
        assert_eq!(config.ws_url, DEFAULT_WS_URL);
        assert_eq!(config.markets, vec![0, 3]);
        assert_eq!(config.reconnect, ReconnectConfig::default());
    }

    #[test]
    fn accounts_require_tokens() {
        let yaml = "accounts:\n  - account_id: 42\n    auth_token: \"\"\n";
        let err = StreamConfig::from_yaml(yaml).expect_err("empty token");
        assert!(err.to_string().contains("account 42"));
    }

    #[test]
    fn empty_feed_list_is_rejected() {
        assert!(StreamConfig::from_yaml("ws_url: wss://example.invalid/stream\n").is_err());
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = ReconnectConfig {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 3_000,
        };
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(1_000));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(2_000));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(3_000));
        assert_eq!(policy.backoff_delay(40), Duration::from_millis(3_000));
    }
}
