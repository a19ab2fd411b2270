/*
[INPUT]:  Feed runner test scenarios
[OUTPUT]: In-process stream server and config fixtures
[POS]:    Test infrastructure - shared across feed runner tests
[UPDATE]: When adding new test patterns or fixtures
*/

#![allow(dead_code)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use lighter_stream::{ReconnectConfig, StreamConfig};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

pub const WAIT: Duration = Duration::from_secs(5);

pub enum Command {
    Text(String),
    Drop,
}

/// Server side of one accepted connection
pub struct Peer {
    incoming: mpsc::UnboundedReceiver<String>,
    commands: mpsc::UnboundedSender<Command>,
}

impl Peer {
    pub fn send(&self, text: impl Into<String>) {
        let _ = self.commands.send(Command::Text(text.into()));
    }

    pub fn drop_connection(&self) {
        let _ = self.commands.send(Command::Drop);
    }

    pub async fn recv(&mut self) -> Option<String> {
        timeout(WAIT, self.incoming.recv()).await.expect("frame in time")
    }

    pub async fn recv_json(&mut self) -> Value {
        let raw = self.recv().await.expect("connection open");
        serde_json::from_str(&raw).expect("json frame")
    }

    /// Channel named by the next client frame
    pub async fn recv_channel(&mut self) -> String {
        let frame = self.recv_json().await;
        frame["channel"].as_str().expect("channel field").to_string()
    }
}

/// Listening stream endpoint; every accepted connection shows up as a [`Peer`]
pub struct TestServer {
    pub url: String,
    peers: mpsc::UnboundedReceiver<Peer>,
    accept: JoinHandle<()>,
}

impl TestServer {
    pub async fn next_peer(&mut self) -> Peer {
        timeout(WAIT, self.peers.recv())
            .await
            .expect("connection in time")
            .expect("server running")
    }

    /// Stop accepting; later connection attempts are refused
    pub async fn stop_listening(&mut self) {
        self.accept.abort();
        let _ = (&mut self.accept).await;
    }
}

/// Bind 127.0.0.1:0 and accept connections in the background
pub async fn spawn_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let url = format!("ws://{}", listener.local_addr().expect("addr"));
    let (peer_tx, peers) = mpsc::unbounded_channel();

    let accept = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let peer_tx = peer_tx.clone();
            tokio::spawn(async move {
                let Ok(socket) = accept_async(stream).await else {
                    return;
                };
                let (mut sink, mut source) = socket.split();
                let (in_tx, incoming) = mpsc::unbounded_channel();
                let (commands, mut command_rx) = mpsc::unbounded_channel();
                if peer_tx.send(Peer { incoming, commands }).is_err() {
                    return;
                }
                loop {
                    tokio::select! {
                        command = command_rx.recv() => match command {
                            Some(Command::Text(text)) => {
                                if sink.send(Message::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                            Some(Command::Drop) | None => break,
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

    TestServer { url, peers, accept }
}

pub fn market_config(url: &str, markets: Vec<u8>) -> StreamConfig {
    StreamConfig {
        ws_url: url.to_string(),
        markets,
        accounts: Vec::new(),
        reconnect: ReconnectConfig {
            max_attempts: 3,
            base_delay_ms: 10,
            max_delay_ms: 50,
        },
    }
}
