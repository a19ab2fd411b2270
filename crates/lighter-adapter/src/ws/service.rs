/*
[INPUT]:  ConnectionManager, optional TokenGenerator, per-channel frame handlers
[OUTPUT]: Start/reconnect/close lifecycle and subscription handles shared by the facades
[POS]:    WebSocket layer - common core of the public and private stream services
[UPDATE]: When changing service lifecycle or subscription ownership
*/

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::auth::TokenGenerator;
use crate::http::{LighterError, Result};
use crate::ws::config::WsConfig;
use crate::ws::connection::{ChannelSubscription, ConnectionManager};
use crate::ws::message::ChannelKey;
use crate::ws::router::HandlerId;

/// Observability hook invoked with [`LighterError::ConnectionLost`] when the stream drops
pub type ErrorHandler = Arc<dyn Fn(LighterError) + Send + Sync>;

struct ActiveSubscription {
    handler_id: HandlerId,
    subscription: ChannelSubscription,
}

pub(crate) struct ServiceCore {
    name: &'static str,
    manager: ConnectionManager,
    token_generator: Option<Arc<dyn TokenGenerator>>,
    shutdown: RwLock<CancellationToken>,
    err_handler: RwLock<Option<ErrorHandler>>,
    subscriptions: Mutex<HashMap<ChannelKey, ActiveSubscription>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for ServiceCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCore")
            .field("name", &self.name)
            .field("manager", &self.manager)
            .field("authenticated", &self.token_generator.is_some())
            .finish()
    }
}

impl ServiceCore {
    pub fn new(
        name: &'static str,
        config: WsConfig,
        token_generator: Option<Arc<dyn TokenGenerator>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            manager: ConnectionManager::new(config),
            token_generator,
            shutdown: RwLock::new(CancellationToken::new()),
            err_handler: RwLock::new(None),
            subscriptions: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        })
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    /// Connect and install `err_handler` as the connection-lost hook
    pub async fn start<F>(self: &Arc<Self>, ctx: &CancellationToken, err_handler: F) -> Result<()>
    where
        F: Fn(LighterError) + Send + Sync + 'static,
    {
        *self.err_handler.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(err_handler));
        *self.shutdown.write().unwrap_or_else(PoisonError::into_inner) = ctx.child_token();
        self.closed.store(false, Ordering::Release);

        let core = Arc::downgrade(self);
        self.manager.set_on_disconnected(move || {
            if let Some(core) = core.upgrade() {
                core.report(LighterError::ConnectionLost);
            }
        });

        self.connect().await?;
        info!(service = self.name, "stream service started");
        Ok(())
    }

    /// Connect again after a loss; tracked channels are replayed by the manager
    pub async fn reconnect(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LighterError::NotConnected);
        }
        self.connect().await
    }

    async fn connect(&self) -> Result<()> {
        self.refresh_token()?;
        let shutdown = self.shutdown.read().unwrap_or_else(PoisonError::into_inner).clone();
        self.manager.connect(&shutdown).await
    }

    fn refresh_token(&self) -> Result<()> {
        let Some(generator) = &self.token_generator else {
            return Ok(());
        };
        let token = generator
            .token()
            .ok_or_else(|| LighterError::Auth("token generator returned no token".to_string()))?;
        self.manager.set_auth_token(Some(token));
        Ok(())
    }

    fn report(&self, err: LighterError) {
        warn!(service = self.name, error = %err, "stream service error");
        let handler = self.err_handler.read().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(handler) = handler {
            handler(err);
        }
    }

    /// Register `handler` for `kinds` and subscribe `key`; the handler is removed on failure
    pub async fn subscribe_channel<F>(
        self: &Arc<Self>,
        key: ChannelKey,
        kinds: &[&str],
        handler: F,
    ) -> Result<SubscriptionHandle>
    where
        F: Fn(&str) -> Result<()> + Send + Sync + 'static,
    {
        let mut subscriptions = self.subscriptions.lock().await;
        if subscriptions.contains_key(&key) {
            return Err(LighterError::AlreadySubscribed {
                channel: key.to_string(),
            });
        }

        let router = self.manager.router();
        let handler_id = router.register(kinds, handler);
        let subscription = match self.manager.subscribe(key.clone()).await {
            Ok(subscription) => subscription,
            Err(err) => {
                router.unregister(handler_id);
                return Err(err);
            }
        };

        subscriptions.insert(
            key.clone(),
            ActiveSubscription {
                handler_id,
                subscription,
            },
        );
        info!(service = self.name, channel = %key, "stream subscription added");

        Ok(SubscriptionHandle {
            core: Arc::downgrade(self),
            key,
            done: AtomicBool::new(false),
        })
    }

    async fn unsubscribe_channel(&self, key: &ChannelKey) -> Result<()> {
        let Some(active) = self.subscriptions.lock().await.remove(key) else {
            return Ok(());
        };
        self.manager.router().unregister(active.handler_id);
        active.subscription.unsubscribe().await?;
        info!(service = self.name, channel = %key, "stream subscription removed");
        Ok(())
    }

    /// Drop every subscription, disconnect, and stop; repeated calls are no-ops
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let drained: Vec<(ChannelKey, ActiveSubscription)> =
            self.subscriptions.lock().await.drain().collect();
        for (key, active) in drained {
            self.manager.router().unregister(active.handler_id);
            if let Err(err) = active.subscription.unsubscribe().await {
                warn!(service = self.name, channel = %key, error = %err, "unsubscribe on close failed");
            }
        }

        let result = self.manager.disconnect().await;
        self.shutdown.read().unwrap_or_else(PoisonError::into_inner).cancel();
        info!(service = self.name, "stream service closed");
        result
    }
}

/// Caller's handle to one facade subscription; unsubscribing twice is a no-op
#[derive(Debug)]
pub struct SubscriptionHandle {
    core: Weak<ServiceCore>,
    key: ChannelKey,
    done: AtomicBool,
}

impl SubscriptionHandle {
    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    pub async fn unsubscribe(&self) -> Result<()> {
        if self.done.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        match self.core.upgrade() {
            Some(core) => core.unsubscribe_channel(&self.key).await,
            None => Ok(()),
        }
    }
}
