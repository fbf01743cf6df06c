//! In-memory transport and API doubles for lifecycle tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use bronze_core::{
    ApiError, ApiResult, Channel, ChatApi, CloseCode, Frame, FrameType, GatewayResolver,
    MessageIdentifier, Post, PostResponse, Transport, TransportError, TransportResult, User,
};

/// Everything the code under test did to the transport, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Wire {
    Dial(String),
    Json(Value),
    SendFailed,
    Close,
    Stop,
}

impl Wire {
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, Wire::Json(value) if value["op"] == 1)
    }
}

/// Shared, ordered log of transport operations and plugin hooks.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// A transport fed by the test.
///
/// `close()` answers with a normal close on the read side, like a well
/// behaved peer.
pub struct FakeTransport {
    inbound_tx: mpsc::UnboundedSender<TransportResult<Frame>>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<TransportResult<Frame>>>,
    wire: mpsc::UnboundedSender<Wire>,
    journal: Journal,
    failing_dials: AtomicUsize,
    failing_sends: AtomicBool,
}

impl FakeTransport {
    pub fn new(journal: Journal) -> (Arc<Self>, mpsc::UnboundedReceiver<Wire>) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (wire, wire_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            wire,
            journal,
            failing_dials: AtomicUsize::new(0),
            failing_sends: AtomicBool::new(false),
        });
        (transport, wire_rx)
    }

    pub fn push_json(&self, value: Value) {
        let _ = self.inbound_tx.send(Ok(Frame::text(value.to_string())));
    }

    pub fn push_text(&self, text: &str) {
        let _ = self.inbound_tx.send(Ok(Frame::text(text)));
    }

    pub fn push_error(&self, error: TransportError) {
        let _ = self.inbound_tx.send(Err(error));
    }

    pub fn push_close(&self, code: CloseCode) {
        self.push_error(TransportError::closed(code, ""));
    }

    pub fn fail_next_dials(&self, count: usize) {
        self.failing_dials.store(count, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.failing_sends.store(fail, Ordering::SeqCst);
    }

    fn record(&self, wire: Wire, entry: impl Into<String>) {
        self.journal.push(entry);
        let _ = self.wire.send(wire);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn dial(&self, url: &str) -> TransportResult<()> {
        let failing = self
            .failing_dials
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        self.record(Wire::Dial(url.to_string()), format!("dial {url}"));
        if failing {
            return Err(TransportError::ConnectionFailed {
                url: url.to_string(),
                reason: "refused".into(),
            });
        }
        Ok(())
    }

    async fn send_message(&self, frame: Frame) -> TransportResult<()> {
        if self.failing_sends.load(Ordering::SeqCst) {
            self.record(Wire::SendFailed, "send failed");
            return Err(TransportError::SendFailed("broken pipe".into()));
        }
        match frame.kind {
            FrameType::Close => {
                self.record(Wire::Close, "close");
                self.push_close(CloseCode::Normal);
            }
            FrameType::Text | FrameType::Binary => {
                let value: Value = serde_json::from_slice(&frame.data)
                    .map_err(|e| TransportError::SendFailed(e.to_string()))?;
                let entry = format!("send op{}", value["op"]);
                self.record(Wire::Json(value), entry);
            }
        }
        Ok(())
    }

    async fn read_message(&self) -> TransportResult<Frame> {
        let mut inbound = self.inbound_rx.lock().await;
        inbound.recv().await.unwrap_or(Err(TransportError::NotConnected))
    }

    async fn close(&self) -> TransportResult<()> {
        self.send_message(Frame::close(CloseCode::Normal, "")).await
    }

    /// Drops frames still queued for the released connection.
    async fn stop(&self) {
        if let Ok(mut inbound) = self.inbound_rx.try_lock() {
            while inbound.try_recv().is_ok() {}
        }
        self.record(Wire::Stop, "stop");
    }
}

/// Resolver and chat API double.
#[derive(Default)]
pub struct FakeApi {
    urls: Mutex<VecDeque<String>>,
    resolves: AtomicUsize,
    fail_resolve: AtomicBool,
    pub posts: Mutex<Vec<Post>>,
}

impl FakeApi {
    /// Resolves to `urls` in order; the last one repeats.
    pub fn with_urls(urls: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            urls: Mutex::new(urls.iter().map(|u| u.to_string()).collect()),
            ..Default::default()
        })
    }

    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    pub fn fail_resolve(&self, fail: bool) {
        self.fail_resolve.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl GatewayResolver for FakeApi {
    async fn resolve_gateway(&self) -> ApiResult<String> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        if self.fail_resolve.load(Ordering::SeqCst) {
            return Err(ApiError::http(503, "unavailable"));
        }
        let mut urls = self.urls.lock();
        let url = if urls.len() > 1 {
            urls.pop_front()
        } else {
            urls.front().cloned()
        };
        url.ok_or_else(|| ApiError::Other("no gateway configured".into()))
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn create_post(&self, post: Post) -> ApiResult<PostResponse> {
        let id = MessageIdentifier::new("sent", post.channel_id.clone());
        self.posts.lock().push(post);
        Ok(PostResponse { post_id: id })
    }

    async fn update_post(&self, id: &MessageIdentifier, _post: Post) -> ApiResult<PostResponse> {
        Ok(PostResponse {
            post_id: id.clone(),
        })
    }

    async fn delete_post(&self, id: &MessageIdentifier) -> ApiResult<PostResponse> {
        Ok(PostResponse {
            post_id: id.clone(),
        })
    }

    async fn get_user(&self, user_id: &str) -> ApiResult<User> {
        Err(ApiError::not_found("user", user_id))
    }

    async fn get_channel(&self, channel_id: &str) -> ApiResult<Channel> {
        Err(ApiError::not_found("channel", channel_id))
    }
}
