/*
[INPUT]:  Bearer tokens and expiration timestamps
[OUTPUT]: Token retrieval for authenticated stream connects
[POS]:    Auth layer - token lifecycle management
[UPDATE]: When adding token refresh or changing storage strategy
*/

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, PoisonError, RwLock};

/// Source of the bearer token attached to private stream connects.
///
/// Called on every connect, so implementations may rotate tokens.
pub trait TokenGenerator: Send + Sync {
    fn token(&self) -> Option<String>;
}

impl<F> TokenGenerator for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// Fixed token that never expires
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenGenerator for StaticToken {
    fn token(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.clone())
        }
    }
}

/// Stored token data with metadata
#[derive(Debug, Clone)]
pub struct TokenData {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub account_index: i64,
}

/// Thread-safe token holder refreshed by the caller's signer
#[derive(Debug, Clone)]
pub struct TokenStore {
    data: Arc<RwLock<Option<TokenData>>>,
}

impl TokenStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(None)),
        }
    }

    /// Store a new token with expiration
    pub fn set_token(&self, token: String, expires_seconds: u64, account_index: i64) {
        let expires_at = Utc::now() + Duration::seconds(expires_seconds as i64);
        let token_data = TokenData {
            token,
            expires_at,
            account_index,
        };

        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(token_data);
    }

    /// Get the current token unless it has expired
    pub fn get_token(&self) -> Option<String> {
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|data| Utc::now() <= data.expires_at)
            .map(|data| data.token.clone())
    }

    /// Check if token is expired
    pub fn is_expired(&self) -> bool {
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(data) => Utc::now() > data.expires_at,
            None => true,
        }
    }

    /// Get token data if available
    pub fn token_data(&self) -> Option<TokenData> {
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// Clear the stored token
    pub fn clear(&self) {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenGenerator for TokenStore {
    fn token(&self) -> Option<String> {
        self.get_token()
    }
}
