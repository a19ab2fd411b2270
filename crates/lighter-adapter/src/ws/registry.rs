/*
[INPUT]:  Channel keys from subscribe/unsubscribe calls
[OUTPUT]: Ordered set of currently active subscriptions
[POS]:    WebSocket layer - subscription bookkeeping for replay
[UPDATE]: When subscription identity changes
*/

use std::collections::BTreeSet;

use crate::http::{LighterError, Result};
use crate::ws::message::ChannelKey;

/// Active channel keys; replayed in key order after a reconnect
#[derive(Debug, Default, Clone)]
pub struct SubscriptionRegistry {
    keys: BTreeSet<ChannelKey>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ChannelKey) -> Result<()> {
        if self.keys.contains(&key) {
            return Err(LighterError::AlreadySubscribed {
                channel: key.to_string(),
            });
        }
        self.keys.insert(key);
        Ok(())
    }

    /// Returns whether the key was present
    pub fn remove(&mut self, key: &ChannelKey) -> bool {
        self.keys.remove(key)
    }

    pub fn contains(&self, key: &ChannelKey) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> Vec<ChannelKey> {
        self.keys.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
