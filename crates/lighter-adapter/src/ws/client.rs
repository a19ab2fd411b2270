/*
[INPUT]:  WsConfig and optional TokenGenerator
[OUTPUT]: Public and private stream services sharing one configuration
[POS]:    WebSocket layer - entry point for streaming consumers
[UPDATE]: When adding new stream services
*/

use std::sync::Arc;

use crate::auth::TokenGenerator;
use crate::ws::config::WsConfig;
use crate::ws::private::PrivateStreamService;
use crate::ws::public::PublicStreamService;

/// Factory for stream services; each service owns its own connection
#[derive(Debug, Clone, Default)]
pub struct LighterStream {
    config: WsConfig,
}

impl LighterStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }

    pub fn public(&self) -> PublicStreamService {
        PublicStreamService::new(self.config.clone())
    }

    pub fn private(&self, token_generator: Arc<dyn TokenGenerator>) -> PrivateStreamService {
        PrivateStreamService::new(self.config.clone(), Some(token_generator))
    }
}
