/*
[INPUT]:  Raw inbound text frames from the read loop
[OUTPUT]: Routing decision plus ordered delivery to registered handlers
[POS]:    WebSocket layer - frame classification and dispatch
[UPDATE]: When adding control kinds or changing dispatch guarantees
*/

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::http::Result;
use crate::ws::message::{kinds, InboundEnvelope};

const SAMPLE_LOG_LIMIT: usize = 5;
const RAW_LOG_MAX_BYTES: usize = 512;

/// Callback invoked with the raw text of each frame of a registered kind
pub type FrameHandler = Arc<dyn Fn(&str) -> Result<()> + Send + Sync>;

/// Registration handle returned by [`MessageRouter::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(Uuid);

impl HandlerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// What the router decided to do with a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Remote `ping`; the caller must send exactly one `pong`
    ReplyPong,
    /// Informational control frame
    Control(String),
    /// Queued to this many handlers
    Delivered { kind: String, handlers: usize },
    /// Data kind with nobody listening
    Unrouted(String),
    /// Frame carried a nonzero error code
    ErrorFrame { code: i64, message: String },
    /// Not JSON, or no `type`
    Malformed,
}

struct HandlerSlot {
    id: HandlerId,
    queue: mpsc::UnboundedSender<Arc<str>>,
}

#[derive(Default)]
struct LogSamples {
    parse_failures: AtomicUsize,
    error_frames: AtomicUsize,
    unrouted: AtomicUsize,
}

/// Kind-keyed listener table with one FIFO worker per handler
#[derive(Default)]
pub struct MessageRouter {
    handlers: RwLock<HashMap<String, Vec<HandlerSlot>>>,
    samples: LogSamples,
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("kinds", &self.registered_kinds())
            .finish()
    }
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every kind in `kinds`.
    ///
    /// Frames of all listed kinds share one queue, so they reach the handler in wire order.
    /// The handler runs on the blocking pool, so a slow handler never stalls the read loop.
    /// Must be called from within a tokio runtime.
    pub fn register<F>(&self, kinds: &[&str], handler: F) -> HandlerId
    where
        F: Fn(&str) -> Result<()> + Send + Sync + 'static,
    {
        let id = HandlerId::new();
        let (queue, mut rx) = mpsc::unbounded_channel::<Arc<str>>();
        let handler: FrameHandler = Arc::new(handler);

        tokio::task::spawn_blocking(move || {
            while let Some(raw) = rx.blocking_recv() {
                match catch_unwind(AssertUnwindSafe(|| handler(&*raw))) {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => warn!(handler = ?id, error = %err, "ws handler returned error"),
                    Err(panic) => error!(
                        handler = ?id,
                        panic = panic_message(&*panic),
                        "ws handler panicked"
                    ),
                }
            }
            debug!(handler = ?id, "ws handler worker stopped");
        });

        let mut table = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        for kind in kinds {
            table.entry((*kind).to_string()).or_default().push(HandlerSlot {
                id,
                queue: queue.clone(),
            });
        }
        id
    }

    /// Remove a handler from every kind; its worker drains what was already queued, then stops.
    /// Returns whether anything was removed.
    pub fn unregister(&self, id: HandlerId) -> bool {
        let mut table = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = false;
        table.retain(|_, slots| {
            let before = slots.len();
            slots.retain(|slot| slot.id != id);
            removed |= slots.len() != before;
            !slots.is_empty()
        });
        removed
    }

    pub fn handler_count(&self, kind: &str) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .map_or(0, Vec::len)
    }

    fn registered_kinds(&self) -> Vec<String> {
        let table = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let mut kinds: Vec<String> = table.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Classify one frame and queue it to every handler of its kind.
    /// Never waits on a handler.
    pub fn route(&self, raw: &str) -> RouteOutcome {
        let envelope: InboundEnvelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                self.log_sampled(&self.samples.parse_failures, "ws frame parse failed", &err.to_string(), raw);
                return RouteOutcome::Malformed;
            }
        };

        if let Some((code, message)) = envelope.error() {
            self.log_sampled(&self.samples.error_frames, "ws error frame dropped", &format!("code {code}: {message}"), raw);
            return RouteOutcome::ErrorFrame { code, message };
        }

        let Some(kind) = envelope.kind else {
            self.log_sampled(&self.samples.parse_failures, "ws frame parse failed", "missing type", raw);
            return RouteOutcome::Malformed;
        };

        if kind == kinds::PING {
            return RouteOutcome::ReplyPong;
        }

        let delivered = {
            let table = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            match table.get(&kind) {
                Some(slots) => {
                    let payload: Arc<str> = Arc::from(raw);
                    slots
                        .iter()
                        .filter(|slot| slot.queue.send(Arc::clone(&payload)).is_ok())
                        .count()
                }
                None => 0,
            }
        };

        if delivered > 0 {
            return RouteOutcome::Delivered {
                kind,
                handlers: delivered,
            };
        }

        if is_control_kind(&kind) {
            debug!(kind = %kind, "ws control frame");
            return RouteOutcome::Control(kind);
        }

        self.log_sampled(&self.samples.unrouted, "ws frame kind unrouted", &kind, raw);
        RouteOutcome::Unrouted(kind)
    }

    fn log_sampled(&self, counter: &AtomicUsize, event: &'static str, detail: &str, raw: &str) {
        let count = counter.fetch_add(1, Ordering::Relaxed);
        if count < SAMPLE_LOG_LIMIT {
            info!(
                sample_index = count + 1,
                sample_limit = SAMPLE_LOG_LIMIT,
                detail,
                bytes = raw.len(),
                "{event}"
            );
            debug!(
                sample_index = count + 1,
                preview = %truncate_for_log(raw, RAW_LOG_MAX_BYTES),
                "{event}"
            );
        }
    }
}

fn is_control_kind(kind: &str) -> bool {
    matches!(
        kind,
        kinds::PONG | kinds::CONNECTED | kinds::SUBSCRIBED | kinds::UNSUBSCRIBED
    )
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = panic.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}

pub(crate) fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + 3);
    out.push_str(&value[..end]);
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::LighterError;
    use std::time::Duration;
    use tokio::time::timeout;

    fn collector(router: &MessageRouter, kinds: &[&str]) -> (HandlerId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = router.register(kinds, move |raw| {
            let _ = tx.send(raw.to_string());
            Ok(())
        });
        (id, rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("delivery in time")
            .expect("channel open")
    }

    #[tokio::test]
    async fn malformed_frame_is_dropped_and_later_frames_still_flow() {
        let router = MessageRouter::new();
        let (_id, mut rx) = collector(&router, &[kinds::ORDER_BOOK_UPDATE]);

        assert_eq!(router.route("not json {"), RouteOutcome::Malformed);
        assert_eq!(router.route(r#"{"channel":"order_book:3"}"#), RouteOutcome::Malformed);

        let frame = r#"{"type":"update/order_book","channel":"order_book:3"}"#;
        assert_eq!(
            router.route(frame),
            RouteOutcome::Delivered {
                kind: kinds::ORDER_BOOK_UPDATE.to_string(),
                handlers: 1
            }
        );
        assert_eq!(next(&mut rx).await, frame);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn error_frames_never_reach_handlers() {
        let router = MessageRouter::new();
        let (_id, mut rx) = collector(&router, &[kinds::ORDER_BOOK_UPDATE]);

        let outcome = router.route(r#"{"type":"update/order_book","code":30003,"message":"bad market"}"#);
        assert_eq!(
            outcome,
            RouteOutcome::ErrorFrame {
                code: 30003,
                message: "bad market".to_string()
            }
        );
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn ping_asks_for_pong_and_control_kinds_are_informational() {
        let router = MessageRouter::new();
        assert_eq!(router.route(r#"{"type":"ping"}"#), RouteOutcome::ReplyPong);
        assert_eq!(
            router.route(r#"{"type":"connected","session_id":"abc"}"#),
            RouteOutcome::Control("connected".to_string())
        );
        assert_eq!(
            router.route(r#"{"type":"update/trade"}"#),
            RouteOutcome::Unrouted("update/trade".to_string())
        );
    }

    #[tokio::test]
    async fn snapshot_and_updates_arrive_in_wire_order() {
        let router = MessageRouter::new();
        let (_id, mut rx) = collector(&router, &[kinds::ORDER_BOOK_SNAPSHOT, kinds::ORDER_BOOK_UPDATE]);

        let frames: Vec<String> = std::iter::once(r#"{"type":"subscribed/order_book","n":0}"#.to_string())
            .chain((1..20).map(|n| format!(r#"{{"type":"update/order_book","n":{n}}}"#)))
            .collect();
        for frame in &frames {
            router.route(frame);
        }

        for frame in &frames {
            assert_eq!(&next(&mut rx).await, frame);
        }
    }

    #[tokio::test]
    async fn panicking_handler_does_not_stop_other_handlers() {
        let router = MessageRouter::new();
        router.register(&[kinds::ACCOUNT_UPDATE], |_| panic!("boom"));
        router.register(&[kinds::ACCOUNT_UPDATE], |_| Err(LighterError::Handler("nope".into())));
        let (_id, mut rx) = collector(&router, &[kinds::ACCOUNT_UPDATE]);

        for n in 0..3 {
            let frame = format!(r#"{{"type":"update/account_all","n":{n}}}"#);
            assert!(matches!(
                router.route(&frame),
                RouteOutcome::Delivered { handlers: 3, .. }
            ));
            assert_eq!(next(&mut rx).await, frame);
        }
    }

    #[tokio::test]
    async fn unregister_removes_only_that_handler() {
        let router = MessageRouter::new();
        let (first, mut first_rx) = collector(&router, &[kinds::ORDER_BOOK_UPDATE]);
        let (_second, mut second_rx) = collector(&router, &[kinds::ORDER_BOOK_UPDATE]);

        assert!(router.unregister(first));
        assert!(!router.unregister(first));
        assert_eq!(router.handler_count(kinds::ORDER_BOOK_UPDATE), 1);

        router.route(r#"{"type":"update/order_book"}"#);
        next(&mut second_rx).await;
        assert!(first_rx.recv().await.is_none());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_for_log("abc", 8), "abc");
        assert_eq!(truncate_for_log("abcdef", 3), "abc...");
        assert_eq!(truncate_for_log("ééé", 3), "é...");
    }
}
