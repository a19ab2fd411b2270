/*
[INPUT]:  WsConfig and typed order book callbacks
[OUTPUT]: Market data subscriptions over an unauthenticated stream
[POS]:    WebSocket layer - public facade
[UPDATE]: When adding public channels
*/

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::http::{LighterError, Result};
use crate::ws::config::WsConfig;
use crate::ws::message::{kinds, ChannelKey, OrderBookEvent};
use crate::ws::service::{ServiceCore, SubscriptionHandle};

/// Parameters for [`PublicStreamService::subscribe_order_book`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBookParams {
    pub market_id: u8,
}

/// Public market data stream
#[derive(Debug)]
pub struct PublicStreamService {
    core: Arc<ServiceCore>,
}

impl PublicStreamService {
    pub fn new(config: WsConfig) -> Self {
        Self {
            core: ServiceCore::new("public", config, None),
        }
    }

    /// Connect; `err_handler` receives [`LighterError::ConnectionLost`] whenever the stream drops
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

    /// Stream snapshot and incremental updates for one market
    pub async fn subscribe_order_book<F>(&self, params: OrderBookParams, callback: F) -> Result<SubscriptionHandle>
    where
        F: Fn(OrderBookEvent) -> Result<()> + Send + Sync + 'static,
    {
        let market_id = params.market_id;
        self.core
            .subscribe_channel(
                ChannelKey::order_book(market_id),
                &[kinds::ORDER_BOOK_SNAPSHOT, kinds::ORDER_BOOK_UPDATE],
                move |raw| match OrderBookEvent::decode(raw, market_id)? {
                    Some(event) => callback(event),
                    None => Ok(()),
                },
            )
            .await
    }

    pub async fn subscribe_ticker(&self, _market_id: u8) -> Result<SubscriptionHandle> {
        Err(LighterError::UnsupportedOperation {
            operation: "subscribe_ticker",
        })
    }

    pub async fn subscribe_trades(&self, _market_id: u8) -> Result<SubscriptionHandle> {
        Err(LighterError::UnsupportedOperation {
            operation: "subscribe_trades",
        })
    }

    pub async fn close(&self) -> Result<()> {
        self.core.close().await
    }
}
