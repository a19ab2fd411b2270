/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities: REST mock server, in-process stream server, collectors
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for lighter-adapter tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use lighter_adapter::{Result, WsConfig};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::{accept_async, accept_hdr_async, WebSocketStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;
use wiremock::MockServer;

pub const WAIT: Duration = Duration::from_secs(3);

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Mock bearer token for testing
pub fn mock_auth_token() -> String {
    "ro:42:single:1767225600:deadbeef".to_string()
}

/// Stream config with short deadlines and no heartbeat noise
pub fn test_ws_config(url: &str) -> WsConfig {
    WsConfig {
        handshake_timeout: Duration::from_secs(5),
        ping_interval: Duration::from_secs(60),
        read_timeout: Duration::from_secs(10),
        write_timeout: Duration::from_secs(2),
        resubscribe_delay: Duration::from_millis(10),
        ..WsConfig::default().with_url(url)
    }
}

enum ServerCommand {
    Text(String),
    Drop,
}

/// Server side of one accepted stream connection
pub struct ServerConn {
    pub auth: Option<String>,
    incoming: mpsc::UnboundedReceiver<String>,
    commands: mpsc::UnboundedSender<ServerCommand>,
}

impl ServerConn {
    pub fn send(&self, text: impl Into<String>) {
        let _ = self.commands.send(ServerCommand::Text(text.into()));
    }

    /// Kill the socket without a close handshake
    pub fn drop_connection(&self) {
        let _ = self.commands.send(ServerCommand::Drop);
    }

    /// Next text frame from the client, or `None` once the connection is gone
    pub async fn recv(&mut self) -> Option<String> {
        timeout(WAIT, self.incoming.recv()).await.expect("client frame in time")
    }

    pub async fn recv_json(&mut self) -> Value {
        let raw = self.recv().await.expect("connection open");
        serde_json::from_str(&raw).expect("client sent json")
    }

    /// Assert nothing else arrives for `window`
    pub async fn expect_silence(&mut self, window: Duration) {
        if let Ok(Some(frame)) = timeout(window, self.incoming.recv()).await {
            panic!("unexpected client frame {frame}");
        }
    }
}

/// In-process stream server on 127.0.0.1; yields each accepted connection
pub struct TestWsServer {
    pub url: String,
    connections: mpsc::UnboundedReceiver<ServerConn>,
}

impl TestWsServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("ws://{}", listener.local_addr().expect("addr"));
        let (conn_tx, connections) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let conn_tx = conn_tx.clone();
                tokio::spawn(async move {
                    let captured = Arc::new(Mutex::new(None));
                    let sink_auth = Arc::clone(&captured);
                    let callback = move |request: &Request, response: Response| -> std::result::Result<Response, ErrorResponse> {
                        let auth = request
                            .headers()
                            .get(AUTHORIZATION)
                            .and_then(|value| value.to_str().ok())
                            .map(str::to_string);
                        *sink_auth.lock().expect("auth slot") = auth;
                        Ok(response)
                    };
                    let Ok(socket) = accept_hdr_async(stream, callback).await else {
                        return;
                    };
                    let auth = captured.lock().expect("auth slot").take();

                    let (mut sink, mut source) = socket.split();
                    let (in_tx, incoming) = mpsc::unbounded_channel();
                    let (commands, mut command_rx) = mpsc::unbounded_channel();
                    if conn_tx
                        .send(ServerConn {
                            auth,
                            incoming,
                            commands,
                        })
                        .is_err()
                    {
                        return;
                    }

                    loop {
                        tokio::select! {
                            command = command_rx.recv() => match command {
                                Some(ServerCommand::Text(text)) => {
                                    if sink.send(Message::Text(text.into())).await.is_err() {
                                        break;
                                    }
                                }
                                Some(ServerCommand::Drop) | None => break,
                            },
                            message = source.next() => match message {
                                Some(Ok(Message::Text(text))) => {
                                    let _ = in_tx.send(text.to_string());
                                }
                                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                Some(Ok(_)) => {}
                            },
                        }
                    }
                });
            }
        });

        Self { url, connections }
    }

    pub async fn accept(&mut self) -> ServerConn {
        timeout(WAIT, self.connections.recv())
            .await
            .expect("client connected in time")
            .expect("server running")
    }

    /// Assert no further connection is opened for `window`
    pub async fn expect_no_connection(&mut self, window: Duration) {
        if timeout(window, self.connections.recv()).await.is_ok() {
            panic!("unexpected extra connection");
        }
    }
}

/// Completes the handshake, then never reads, so client writes back up
pub struct StalledWsServer {
    pub url: String,
    socket: oneshot::Receiver<WebSocketStream<TcpStream>>,
}

impl StalledWsServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("ws://{}", listener.local_addr().expect("addr"));
        let (socket_tx, socket) = oneshot::channel();

        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            if let Ok(socket) = accept_async(stream).await {
                let _ = socket_tx.send(socket);
            }
        });

        Self { url, socket }
    }

    /// The accepted socket; keep it alive and unpolled for the stall to hold
    pub async fn accept(self) -> WebSocketStream<TcpStream> {
        timeout(WAIT, self.socket)
            .await
            .expect("client connected in time")
            .expect("handshake completed")
    }
}

/// Typed callback that forwards every event into a channel
pub fn collector<T: Send + 'static>() -> (impl Fn(T) -> Result<()> + Send + Sync + 'static, mpsc::UnboundedReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback = move |event: T| -> Result<()> {
        let _ = tx.send(event);
        Ok(())
    };
    (callback, rx)
}

pub async fn next_event<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(WAIT, rx.recv())
        .await
        .expect("event in time")
        .expect("collector open")
}

/// Poll `condition` until it holds or the wait budget runs out
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met in time");
        sleep(Duration::from_millis(10)).await;
    }
}
