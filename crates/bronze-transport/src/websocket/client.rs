//! WebSocket client transport.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use bronze_core::{CloseCode, Frame, FrameType, Transport, TransportError, TransportResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Close code reported when the stream ends without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

/// A [`Transport`] over a single WebSocket client connection.
///
/// The write and read halves are locked separately, so the receive loop can
/// wait on [`read_message`](Transport::read_message) while heartbeats and
/// closes are sent.
pub struct WsTransport {
    sink: Mutex<Option<WsSink>>,
    source: Mutex<Option<WsSource>>,
    /// Cancelled by `stop` (and by the next `dial`) to wake a pending read.
    stop: parking_lot::Mutex<CancellationToken>,
    connect_timeout: Duration,
}

impl WsTransport {
    /// Creates an unconnected transport.
    pub fn new() -> Self {
        Self::with_connect_timeout(Duration::from_secs(30))
    }

    /// Creates an unconnected transport with a custom dial timeout.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self {
            sink: Mutex::new(None),
            source: Mutex::new(None),
            stop: parking_lot::Mutex::new(CancellationToken::new()),
            connect_timeout,
        }
    }

    async fn send_raw(&self, msg: Message) -> TransportResult<()> {
        let mut sink = self.sink.lock().await;
        let sink = sink.as_mut().ok_or(TransportError::NotConnected)?;
        sink.send(msg)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn dial(&self, url: &str) -> TransportResult<()> {
        info!(url = %url, "Connecting to WebSocket server");

        let connecting = tokio::time::timeout(self.connect_timeout, connect_async(url));
        let (stream, _response) = connecting
            .await
            .map_err(|_| TransportError::ConnectionFailed {
                url: url.to_string(),
                reason: format!("timed out after {:?}", self.connect_timeout),
            })?
            .map_err(|e| TransportError::ConnectionFailed {
                url: url.to_string(),
                reason: format!("WebSocket connection failed: {e}"),
            })?;
        let (sink, source) = stream.split();

        let stale = std::mem::replace(&mut *self.stop.lock(), CancellationToken::new());
        stale.cancel();

        *self.sink.lock().await = Some(sink);
        *self.source.lock().await = Some(source);

        info!(url = %url, "WebSocket connected");
        Ok(())
    }

    async fn send_message(&self, frame: Frame) -> TransportResult<()> {
        self.send_raw(to_message(frame)).await
    }

    async fn read_message(&self) -> TransportResult<Frame> {
        let stop = self.stop.lock().clone();
        let mut source = self.source.lock().await;

        loop {
            let stream = source.as_mut().ok_or(TransportError::NotConnected)?;
            let next = tokio::select! {
                _ = stop.cancelled() => return Err(TransportError::NotConnected),
                next = stream.next() => next,
            };

            match next {
                Some(Ok(Message::Text(text))) => {
                    trace!(len = text.len(), "Received text");
                    return Ok(Frame::text(text.as_str()));
                }
                Some(Ok(Message::Binary(data))) => {
                    trace!(len = data.len(), "Received binary");
                    return Ok(Frame::binary(data.to_vec()));
                }
                Some(Ok(Message::Ping(data))) => {
                    trace!("Received ping, sending pong");
                    if let Err(e) = self.send_raw(Message::Pong(data)).await {
                        debug!(error = %e, "Failed to answer ping");
                    }
                }
                Some(Ok(Message::Pong(_))) => {
                    trace!("Received pong");
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = close_reason(frame);
                    debug!(code = %code, reason = %reason, "Server closed connection");
                    return Err(TransportError::closed(code, reason));
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => return Err(TransportError::ReadFailed(e.to_string())),
                None => {
                    return Err(TransportError::closed(
                        CloseCode::Other(ABNORMAL_CLOSURE),
                        "stream ended",
                    ));
                }
            }
        }
    }

    async fn close(&self) -> TransportResult<()> {
        debug!("Sending close frame");
        self.send_message(Frame::close(CloseCode::Normal, "")).await
    }

    async fn stop(&self) {
        self.stop.lock().cancel();

        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.close().await;
        }
        self.source.lock().await.take();
        debug!("WebSocket transport stopped");
    }
}

fn to_message(frame: Frame) -> Message {
    match frame.kind {
        FrameType::Text => Message::Text(String::from_utf8_lossy(&frame.data).into_owned().into()),
        FrameType::Binary => Message::Binary(frame.data.into()),
        FrameType::Close => {
            let code = frame.close_code().unwrap_or(CloseCode::Normal);
            let reason = frame
                .data
                .get(2..)
                .map(|r| String::from_utf8_lossy(r).into_owned())
                .unwrap_or_default();
            Message::Close(Some(CloseFrame {
                code: WsCloseCode::from(code.as_u16()),
                reason: reason.into(),
            }))
        }
    }
}

fn close_reason(frame: Option<CloseFrame>) -> (CloseCode, String) {
    match frame {
        Some(frame) => (
            CloseCode::from(u16::from(frame.code)),
            frame.reason.as_str().to_string(),
        ),
        None => (CloseCode::Normal, String::new()),
    }
}
