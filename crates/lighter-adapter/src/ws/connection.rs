/*
[INPUT]:  WsConfig, optional bearer token, caller cancellation, subscription intents
[OUTPUT]: One live stream session with read/heartbeat loops and replayable subscriptions
[POS]:    WebSocket layer - connection lifecycle owner
[UPDATE]: When changing connect/disconnect semantics or background loops
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::http::{LighterError, Result};
use crate::ws::config::WsConfig;
use crate::ws::message::{ChannelKey, ControlFrame};
use crate::ws::registry::SubscriptionRegistry;
use crate::ws::router::{MessageRouter, RouteOutcome};
use crate::ws::transport::{self, InboundFrame, TransportReader, TransportWriter};

/// Fired once per unexpected connection loss
pub type DisconnectCallback = Arc<dyn Fn() + Send + Sync>;

struct ConnectionState {
    connected: bool,
    generation: u64,
    shutdown: Option<CancellationToken>,
    registry: SubscriptionRegistry,
}

struct WriterSlot {
    generation: u64,
    writer: TransportWriter,
}

struct Inner {
    config: WsConfig,
    router: Arc<MessageRouter>,
    state: RwLock<ConnectionState>,
    writer: Mutex<Option<WriterSlot>>,
    connect_lock: Mutex<()>,
    auth_token: RwLock<Option<String>>,
    on_disconnected: RwLock<Option<DisconnectCallback>>,
}

/// Owner of the single stream connection.
///
/// Cheap to clone; all clones share one session. Reconnection is never automatic:
/// after a loss the owner calls [`ConnectionManager::connect`] again.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ConnectionManager")
            .field("url", &self.inner.config.url)
            .field("connected", &state.connected)
            .field("generation", &state.generation)
            .field("subscriptions", &state.registry.len())
            .finish()
    }
}

impl ConnectionManager {
    pub fn new(config: WsConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                router: Arc::new(MessageRouter::new()),
                state: RwLock::new(ConnectionState {
                    connected: false,
                    generation: 0,
                    shutdown: None,
                    registry: SubscriptionRegistry::new(),
                }),
                writer: Mutex::new(None),
                connect_lock: Mutex::new(()),
                auth_token: RwLock::new(None),
                on_disconnected: RwLock::new(None),
            }),
        }
    }

    pub fn config(&self) -> &WsConfig {
        &self.inner.config
    }

    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.inner.router
    }

    /// Token attached as `Authorization: Bearer` on the next handshake
    pub fn set_auth_token(&self, token: Option<String>) {
        *self.inner.auth_token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn set_on_disconnected<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.inner.on_disconnected.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Arc::new(callback));
    }

    pub fn is_connected(&self) -> bool {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .connected
    }

    pub fn subscriptions(&self) -> Vec<ChannelKey> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .registry
            .keys()
    }

    pub fn is_subscribed(&self, key: &ChannelKey) -> bool {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .registry
            .contains(key)
    }

    /// Open the session if it is not already open.
    ///
    /// Background loops stop when `ctx` is cancelled or on [`ConnectionManager::disconnect`].
    /// Channels still tracked from a previous session are replayed.
    /// An invalid [`WsConfig`] fails with `Config` before any dial.
    pub async fn connect(&self, ctx: &CancellationToken) -> Result<()> {
        let _connecting = self.inner.connect_lock.lock().await;
        if self.is_connected() {
            return Ok(());
        }

        let config = &self.inner.config;
        config.validate()?;
        let token = self
            .inner
            .auth_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let (writer, reader) =
            transport::connect(&config.url, token.as_deref(), config.handshake_timeout).await?;

        let generation = {
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            state.generation += 1;
            state.generation
        };
        *self.inner.writer.lock().await = Some(WriterSlot { generation, writer });

        let shutdown = ctx.child_token();
        let replay = {
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            state.connected = true;
            state.shutdown = Some(shutdown.clone());
            state.registry.keys()
        };

        tokio::spawn(self.clone().read_loop(reader, generation, shutdown.clone()));
        tokio::spawn(self.clone().heartbeat_loop(generation, shutdown.clone()));
        if !replay.is_empty() {
            tokio::spawn(self.clone().replay_subscriptions(generation, replay, shutdown));
        }

        info!(url = %config.url, generation, authenticated = token.is_some(), "ws connected");
        Ok(())
    }

    /// Close the session and stop background loops. Safe to call repeatedly.
    ///
    /// Does not fire the disconnect callback; returns the close error, if any.
    pub async fn disconnect(&self) -> Result<()> {
        let _connecting = self.inner.connect_lock.lock().await;
        let was_connected = self.mark_disconnected(None).is_some();
        let closed = self.close_writer(None).await;
        if was_connected {
            info!(url = %self.inner.config.url, "ws disconnected");
        }
        closed
    }

    /// Record `key` and send its `subscribe` frame.
    ///
    /// Fails without side effects on a duplicate key or while disconnected.
    pub async fn subscribe(&self, key: ChannelKey) -> Result<ChannelSubscription> {
        {
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            if state.registry.contains(&key) {
                return Err(LighterError::AlreadySubscribed {
                    channel: key.to_string(),
                });
            }
            if !state.connected {
                return Err(LighterError::NotConnected);
            }
            state.registry.insert(key.clone())?;
        }

        if let Err(err) = self.send_frame(None, &ControlFrame::subscribe(&key)).await {
            self.inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .registry
                .remove(&key);
            return Err(err);
        }

        debug!(channel = %key, "ws subscribed");
        Ok(ChannelSubscription {
            manager: self.clone(),
            key,
            done: AtomicBool::new(false),
        })
    }

    /// Forget `key` and send `unsubscribe` when a session is live
    pub async fn unsubscribe(&self, key: &ChannelKey) -> Result<()> {
        let (tracked, connected) = {
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            (state.registry.remove(key), state.connected)
        };
        if !tracked || !connected {
            return Ok(());
        }

        match self.send_frame(None, &ControlFrame::unsubscribe(key)).await {
            Ok(()) | Err(LighterError::NotConnected) => {
                debug!(channel = %key, "ws unsubscribed");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Write one control frame on the live session.
    ///
    /// With `generation` set, the write only goes to that session. A write failure
    /// takes the connection-lost path.
    async fn send_frame(&self, generation: Option<u64>, frame: &ControlFrame) -> Result<()> {
        let text = frame.encode()?;
        let mut writer = self.inner.writer.lock().await;
        let slot = match writer.as_mut() {
            Some(slot) if generation.is_none_or(|expected| expected == slot.generation) => slot,
            _ => return Err(LighterError::NotConnected),
        };
        let slot_generation = slot.generation;

        match slot.writer.send_text(text, self.inner.config.write_timeout).await {
            Ok(()) => Ok(()),
            Err(err) => {
                drop(writer);
                self.fail(slot_generation, &err).await;
                Err(err)
            }
        }
    }

    /// Flip to disconnected and cancel the loops, at most once per session.
    /// Returns the generation that was torn down.
    fn mark_disconnected(&self, generation: Option<u64>) -> Option<u64> {
        let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
        if !state.connected || generation.is_some_and(|expected| expected != state.generation) {
            return None;
        }
        state.connected = false;
        if let Some(shutdown) = state.shutdown.take() {
            shutdown.cancel();
        }
        Some(state.generation)
    }

    async fn close_writer(&self, generation: Option<u64>) -> Result<()> {
        let mut writer = self.inner.writer.lock().await;
        let owned = writer
            .as_ref()
            .is_some_and(|slot| generation.is_none_or(|expected| expected == slot.generation));
        match writer.take_if(|_| owned) {
            Some(mut slot) => slot.writer.close(self.inner.config.write_timeout).await,
            None => Ok(()),
        }
    }

    /// Owner context was cancelled; tear down quietly unless already torn down
    async fn release(&self, generation: u64) {
        if self.mark_disconnected(Some(generation)).is_none() {
            return;
        }
        if let Err(err) = self.close_writer(Some(generation)).await {
            debug!(error = %err, "ws close after cancellation");
        }
        info!(generation, "ws connection released");
    }

    /// Unexpected loss of session `generation`; notifies the owner once
    async fn fail(&self, generation: u64, reason: &LighterError) {
        if self.mark_disconnected(Some(generation)).is_none() {
            return;
        }
        warn!(generation, error = %reason, "ws connection lost");

        if let Err(err) = self.close_writer(Some(generation)).await {
            debug!(error = %err, "ws close after failure");
        }

        let callback = self
            .inner
            .on_disconnected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            tokio::spawn(async move { callback() });
        }
    }

    async fn read_loop(self, mut reader: TransportReader, generation: u64, shutdown: CancellationToken) {
        let read_timeout = self.inner.config.read_timeout;
        loop {
            let frame = tokio::select! {
                _ = shutdown.cancelled() => {
                    self.release(generation).await;
                    break;
                }
                frame = reader.next_frame(read_timeout) => frame,
            };

            match frame {
                Ok(InboundFrame::Text(text)) => {
                    if self.inner.router.route(&text) == RouteOutcome::ReplyPong
                        && self.send_frame(Some(generation), &ControlFrame::pong()).await.is_err()
                    {
                        break;
                    }
                }
                Ok(InboundFrame::Closed) => {
                    let reason = LighterError::Transport("closed by remote".to_string());
                    self.fail(generation, &reason).await;
                    break;
                }
                Err(err) => {
                    self.fail(generation, &err).await;
                    break;
                }
            }
        }
        debug!(generation, "ws read loop stopped");
    }

    async fn heartbeat_loop(self, generation: u64, shutdown: CancellationToken) {
        let period = self.inner.config.ping_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(err) = self.send_frame(Some(generation), &ControlFrame::ping()).await {
                        debug!(generation, error = %err, "ws ping not sent");
                        break;
                    }
                }
            }
        }
        debug!(generation, "ws heartbeat stopped");
    }

    async fn replay_subscriptions(self, generation: u64, keys: Vec<ChannelKey>, shutdown: CancellationToken) {
        let delay = self.inner.config.resubscribe_delay;
        for (index, key) in keys.into_iter().enumerate() {
            if index > 0 {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = sleep(delay) => {}
                }
            }
            if !self.is_subscribed(&key) {
                continue;
            }
            match self.send_frame(Some(generation), &ControlFrame::subscribe(&key)).await {
                Ok(()) => info!(channel = %key, "ws resubscribed"),
                Err(err) => {
                    warn!(channel = %key, error = %err, "ws resubscribe aborted");
                    return;
                }
            }
        }
    }
}

/// Handle for one channel subscription; unsubscribing twice is a no-op
#[derive(Debug)]
pub struct ChannelSubscription {
    manager: ConnectionManager,
    key: ChannelKey,
    done: AtomicBool,
}

impl ChannelSubscription {
    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    pub async fn unsubscribe(&self) -> Result<()> {
        if self.done.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.manager.unsubscribe(&self.key).await
    }
}
