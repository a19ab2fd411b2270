/*
[INPUT]:  Stream URL, optional bearer token, per-operation deadlines
[OUTPUT]: Split writer/reader halves of one WebSocket session
[POS]:    WebSocket layer - raw socket I/O with bounded waits
[UPDATE]: When changing handshake headers or frame handling
*/

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::http::{LighterError, Result};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of a session
pub(crate) struct TransportWriter {
    sink: SplitSink<Socket, WsMessage>,
}

/// Read half of a session
pub(crate) struct TransportReader {
    stream: SplitStream<Socket>,
}

/// What the reader hands back to the read loop
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum InboundFrame {
    Text(String),
    Closed,
}

/// Open a session, attaching `Authorization: Bearer <token>` when a token is given
pub(crate) async fn connect(
    url: &str,
    auth_token: Option<&str>,
    handshake_timeout: Duration,
) -> Result<(TransportWriter, TransportReader)> {
    let mut request = url.into_client_request().map_err(LighterError::transport)?;
    if let Some(token) = auth_token.filter(|token| !token.is_empty()) {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|err| LighterError::Auth(err.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    let (socket, response) = timeout(handshake_timeout, connect_async(request))
        .await
        .map_err(|_| LighterError::Timeout {
            operation: "handshake",
            duration: handshake_timeout,
        })?
        .map_err(LighterError::transport)?;
    debug!(url, status = response.status().as_u16(), "ws handshake complete");

    let (sink, stream) = socket.split();
    Ok((TransportWriter { sink }, TransportReader { stream }))
}

impl TransportWriter {
    pub async fn send_text(&mut self, text: String, deadline: Duration) -> Result<()> {
        trace!(bytes = text.len(), "ws send");
        timeout(deadline, self.sink.send(WsMessage::Text(text.into())))
            .await
            .map_err(|_| LighterError::Timeout {
                operation: "write",
                duration: deadline,
            })?
            .map_err(LighterError::transport)
    }

    /// Send a close frame and shut the sink
    pub async fn close(&mut self, deadline: Duration) -> Result<()> {
        timeout(deadline, self.sink.close())
            .await
            .map_err(|_| LighterError::Timeout {
                operation: "close",
                duration: deadline,
            })?
            .map_err(LighterError::transport)
    }
}

impl TransportReader {
    /// Next application frame, waiting at most `deadline` for any traffic
    pub async fn next_frame(&mut self, deadline: Duration) -> Result<InboundFrame> {
        loop {
            let incoming = timeout(deadline, self.stream.next())
                .await
                .map_err(|_| LighterError::Timeout {
                    operation: "read",
                    duration: deadline,
                })?;

            match incoming {
                Some(Ok(WsMessage::Text(text))) => return Ok(InboundFrame::Text(text.to_string())),
                Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Ok(InboundFrame::Text(text)),
                    Err(_) => debug!(bytes = bytes.len(), "ws binary frame is not utf-8, skipping"),
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    debug!(?frame, "ws close frame received");
                    return Ok(InboundFrame::Closed);
                }
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Err(err)) => return Err(LighterError::transport(err)),
                None => return Ok(InboundFrame::Closed),
            }
        }
    }
}
