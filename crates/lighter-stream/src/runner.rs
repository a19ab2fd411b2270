/*
[INPUT]:  StreamConfig, shutdown token
[OUTPUT]: Running public/private feeds with logged updates and caller-driven reconnects
[POS]:    Runtime layer - feed orchestration
[UPDATE]: When changing feed lifecycle or reconnection policy
*/

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{anyhow, Context, Result};
use chrono::DateTime;
use lighter_adapter::{
    AccountEvent, AccountParams, LighterStream, OrderBookEvent, OrderBookParams, PrivateStreamService,
    PublicStreamService, StaticToken, TokenGenerator,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::book::LocalBook;
use crate::config::{ReconnectConfig, StreamConfig};

/// One started stream service
enum Feed {
    Public(PublicStreamService),
    Private {
        account_id: i64,
        service: PrivateStreamService,
    },
}

impl Feed {
    fn name(&self) -> String {
        match self {
            Feed::Public(_) => "public".to_string(),
            Feed::Private { account_id, .. } => format!("account:{account_id}"),
        }
    }

    async fn reconnect(&self) -> lighter_adapter::Result<()> {
        match self {
            Feed::Public(service) => service.reconnect().await,
            Feed::Private { service, .. } => service.reconnect().await,
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            Feed::Public(service) => service.is_connected(),
            Feed::Private { service, .. } => service.is_connected(),
        }
    }

    async fn close(&self) -> lighter_adapter::Result<()> {
        match self {
            Feed::Public(service) => service.close().await,
            Feed::Private { service, .. } => service.close().await,
        }
    }
}

/// Latest local book per market, shared with the stream callbacks
pub type Books = Arc<Mutex<HashMap<u8, LocalBook>>>;

/// Starts every configured feed and keeps it alive until shutdown
pub struct FeedRunner {
    config: StreamConfig,
    shutdown: CancellationToken,
    books: Books,
}

impl FeedRunner {
    pub fn new(config: StreamConfig, shutdown: CancellationToken) -> Self {
        Self {
            config,
            shutdown,
            books: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn books(&self) -> Books {
        Arc::clone(&self.books)
    }

    /// Run until the shutdown token fires or a feed cannot be recovered
    pub async fn run(&self) -> Result<()> {
        if self.shutdown.is_cancelled() {
            info!("shutdown requested before start");
            return Ok(());
        }
        let (lost_tx, mut lost_rx) = mpsc::unbounded_channel::<usize>();
        let mut feeds = Vec::new();

        let started = self.start_feeds(&mut feeds, &lost_tx).await;
        let outcome = match started {
            Ok(()) => self.supervise(&feeds, &mut lost_rx).await,
            Err(err) => Err(err),
        };

        for feed in &feeds {
            if let Err(err) = feed.close().await {
                warn!(feed = %feed.name(), error = %err, "feed close failed");
            }
        }
        info!(feeds = feeds.len(), "all feeds closed");
        outcome
    }

    async fn start_feeds(&self, feeds: &mut Vec<Arc<Feed>>, lost_tx: &mpsc::UnboundedSender<usize>) -> Result<()> {
        let stream = LighterStream::with_config(self.config.ws_config());

        if !self.config.markets.is_empty() {
            let service = stream.public();
            let index = feeds.len();
            let notify = lost_tx.clone();
            service
                .start(&self.shutdown, move |err| {
                    warn!(feed = "public", error = %err, "feed lost");
                    let _ = notify.send(index);
                })
                .await
                .context("start public feed")?;
            feeds.push(Arc::new(Feed::Public(service)));

            if let Some(Feed::Public(service)) = feeds.last().map(|feed| &**feed) {
                for &market_id in &self.config.markets {
                    let books = Arc::clone(&self.books);
                    service
                        .subscribe_order_book(OrderBookParams { market_id }, move |event| {
                            log_order_book(&books, &event);
                            Ok(())
                        })
                        .await
                        .with_context(|| format!("subscribe order book {market_id}"))?;
                }
            }
        }

        for account in &self.config.accounts {
            let generator: Arc<dyn TokenGenerator> = Arc::new(StaticToken(account.auth_token.clone()));
            let service = stream.private(generator);
            let index = feeds.len();
            let notify = lost_tx.clone();
            let account_id = account.account_id;
            service
                .start(&self.shutdown, move |err| {
                    warn!(account_id, error = %err, "feed lost");
                    let _ = notify.send(index);
                })
                .await
                .with_context(|| format!("start account feed {account_id}"))?;
            feeds.push(Arc::new(Feed::Private { account_id, service }));

            if let Some(Feed::Private { service, .. }) = feeds.last().map(|feed| &**feed) {
                service
                    .subscribe_account(AccountParams { account_id }, |event| {
                        log_account(&event);
                        Ok(())
                    })
                    .await
                    .with_context(|| format!("subscribe account {account_id}"))?;
            }
        }

        info!(feeds = feeds.len(), "feeds started");
        Ok(())
    }

    /// Each lost feed recovers on its own task; backoffs run side by side
    async fn supervise(&self, feeds: &[Arc<Feed>], lost_rx: &mut mpsc::UnboundedReceiver<usize>) -> Result<()> {
        let mut recovering = HashSet::new();
        let mut recoveries = JoinSet::new();
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("shutdown requested");
                    return Ok(());
                }
                lost = lost_rx.recv() => {
                    let Some(index) = lost.filter(|index| *index < feeds.len()) else {
                        continue;
                    };
                    if recovering.insert(index) {
                        self.spawn_recovery(&mut recoveries, index, &feeds[index]);
                    }
                }
                Some(joined) = recoveries.join_next() => {
                    let (index, outcome) = joined.context("feed recovery task")?;
                    recovering.remove(&index);
                    if !outcome? {
                        return Ok(());
                    }
                    // lost again while the previous attempt was finishing
                    if !feeds[index].is_connected() && recovering.insert(index) {
                        self.spawn_recovery(&mut recoveries, index, &feeds[index]);
                    }
                }
            }
        }
    }

    fn spawn_recovery(&self, recoveries: &mut JoinSet<(usize, Result<bool>)>, index: usize, feed: &Arc<Feed>) {
        let feed = Arc::clone(feed);
        let policy = self.config.reconnect.clone();
        let shutdown = self.shutdown.clone();
        recoveries.spawn(async move { (index, recover(&feed, &policy, &shutdown).await) });
    }
}

/// Reconnect with capped exponential backoff.
/// Returns `Ok(false)` when shutdown interrupted the attempts.
async fn recover(feed: &Feed, policy: &ReconnectConfig, shutdown: &CancellationToken) -> Result<bool> {
    for attempt in 1..=policy.max_attempts {
        if feed.is_connected() {
            return Ok(true);
        }
        let delay = policy.backoff_delay(attempt);
        info!(feed = %feed.name(), attempt, ?delay, "reconnecting");
        tokio::select! {
            _ = shutdown.cancelled() => return Ok(false),
            _ = tokio::time::sleep(delay) => {}
        }

        match feed.reconnect().await {
            Ok(()) => {
                info!(feed = %feed.name(), attempt, "feed reconnected");
                return Ok(true);
            }
            Err(err) => warn!(feed = %feed.name(), attempt, error = %err, "reconnect failed"),
        }
    }
    Err(anyhow!(
        "feed {} gave up after {} reconnect attempts",
        feed.name(),
        policy.max_attempts
    ))
}

fn log_order_book(books: &Books, event: &OrderBookEvent) {
    let mut books = books.lock().unwrap_or_else(PoisonError::into_inner);
    let book = books.entry(event.market_id).or_default();
    book.apply(event);
    let quote = book.quote();

    let best_bid = quote.best_bid.map(|price| price.to_string()).unwrap_or_default();
    let best_ask = quote.best_ask.map(|price| price.to_string()).unwrap_or_default();
    let spread = quote.spread().map(|spread| spread.to_string()).unwrap_or_default();
    if event.is_snapshot {
        info!(
            market_id = event.market_id,
            bids = event.bids.len(),
            asks = event.asks.len(),
            best_bid = %best_bid,
            best_ask = %best_ask,
            spread = %spread,
            "order book snapshot"
        );
    } else {
        debug!(
            market_id = event.market_id,
            offset = event.offset,
            at = %format_timestamp(event.timestamp),
            best_bid = %best_bid,
            best_ask = %best_ask,
            spread = %spread,
            "order book update"
        );
    }
}

fn log_account(event: &AccountEvent) {
    let sections: Vec<&str> = event
        .payload
        .as_object()
        .map(|fields| fields.keys().map(String::as_str).collect())
        .unwrap_or_default();
    info!(
        account_id = event.account_id,
        snapshot = event.is_snapshot,
        at = %format_timestamp(event.timestamp),
        sections = ?sections,
        "account update"
    );
}

fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}
