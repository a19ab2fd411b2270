/*
[INPUT]:  WsConfig, TokenGenerator, typed account callbacks
[OUTPUT]: Account state subscriptions over an authenticated stream
[POS]:    WebSocket layer - private facade
[UPDATE]: When adding private channels or changing auth
*/

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::TokenGenerator;
use crate::http::{LighterError, Result};
use crate::ws::config::WsConfig;
use crate::ws::message::{kinds, AccountEvent, ChannelKey};
use crate::ws::service::{ServiceCore, SubscriptionHandle};

/// Parameters for [`PrivateStreamService::subscribe_account`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountParams {
    pub account_id: i64,
}

/// Account stream; a fresh bearer token is pulled from the generator on every connect
#[derive(Debug)]
pub struct PrivateStreamService {
    core: Arc<ServiceCore>,
}

impl PrivateStreamService {
    pub fn new(config: WsConfig, token_generator: Option<Arc<dyn TokenGenerator>>) -> Self {
        Self {
            core: ServiceCore::new("private", config, token_generator),
        }
    }

    pub async fn start<F>(&self, ctx: &CancellationToken, err_handler: F) -> Result<()>
    where
        F: Fn(LighterError) + Send + Sync + 'static,
    {
        self.core.start(ctx, err_handler).await
    }

    pub async fn reconnect(&self) -> Result<()> {
        self.core.reconnect().await
    }

    pub fn is_connected(&self) -> bool {
        self.core.is_connected()
    }

    /// Stream raw account state for one account; payloads are passed through untouched
    pub async fn subscribe_account<F>(&self, params: AccountParams, callback: F) -> Result<SubscriptionHandle>
    where
        F: Fn(AccountEvent) -> Result<()> + Send + Sync + 'static,
    {
        let account_id = params.account_id;
        self.core
            .subscribe_channel(
                ChannelKey::account_all(account_id),
                &[kinds::ACCOUNT_SNAPSHOT, kinds::ACCOUNT_UPDATE],
                move |raw| match AccountEvent::decode(raw, account_id)? {
                    Some(event) => callback(event),
                    None => Ok(()),
                },
            )
            .await
    }

    pub async fn subscribe_orders(&self, _account_id: i64) -> Result<SubscriptionHandle> {
        Err(LighterError::UnsupportedOperation {
            operation: "subscribe_orders",
        })
    }

    pub async fn close(&self) -> Result<()> {
        self.core.close().await
    }
}
