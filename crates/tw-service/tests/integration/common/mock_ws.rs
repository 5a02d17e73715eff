//! Mock feed server for integration tests.
//!
//! A WebSocket server speaking the venue's public-feed dialect:
//! - Acks `{"op":"subscribe"}` frames with `{"event":"subscribe"}`
//! - Answers `{"op":"ping"}` and literal `ping` with a pong frame
//! - Records received messages
//! - Can broadcast ticker frames and force-drop every connection

use futures_util::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Command sent to a live mock connection.
enum ConnCmd {
    Send(String),
    Close,
}

/// A mock feed server for testing.
pub struct MockFeedServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    messages: Arc<Mutex<VecDeque<String>>>,
    connections: Arc<Mutex<u32>>,
    conn_cmds: Arc<Mutex<Vec<mpsc::UnboundedSender<ConnCmd>>>>,
}

impl MockFeedServer {
    /// Start a new mock feed server on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let messages: Arc<Mutex<VecDeque<String>>> = Arc::new(Mutex::new(VecDeque::new()));
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let conn_cmds: Arc<Mutex<Vec<mpsc::UnboundedSender<ConnCmd>>>> =
            Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let messages_clone = messages.clone();
        let connections_clone = connections.clone();
        let conn_cmds_clone = conn_cmds.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let messages = messages_clone.clone();
                        let connections = connections_clone.clone();
                        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
                        conn_cmds_clone.lock().await.push(cmd_tx);
                        tokio::spawn(handle_connection(stream, messages, connections, cmd_rx));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            messages,
            connections,
            conn_cmds,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Get the number of connections received.
    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// Get all received messages.
    pub async fn received_messages(&self) -> Vec<String> {
        self.messages.lock().await.iter().cloned().collect()
    }

    /// Broadcast a raw text frame to every live connection.
    pub async fn broadcast(&self, frame: String) {
        let senders = self.conn_cmds.lock().await;
        for tx in senders.iter() {
            let _ = tx.send(ConnCmd::Send(frame.clone()));
        }
    }

    /// Broadcast a ticker frame for a symbol at a price.
    pub async fn send_tick(&self, symbol: &str, price: &str) {
        let frame = serde_json::json!({
            "action": "snapshot",
            "arg": {"instType": "USDT-FUTURES", "channel": "ticker", "instId": symbol},
            "data": [{"instId": symbol, "lastPr": price, "ts": "1695715383021"}]
        })
        .to_string();
        self.broadcast(frame).await;
    }

    /// Force-close every live connection (simulates a venue drop).
    pub async fn drop_connections(&self) {
        let mut senders = self.conn_cmds.lock().await;
        for tx in senders.drain(..) {
            let _ = tx.send(ConnCmd::Close);
        }
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        self.drop_connections().await;
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    messages: Arc<Mutex<VecDeque<String>>>,
    connections: Arc<Mutex<u32>>,
    mut cmd_rx: mpsc::UnboundedReceiver<ConnCmd>,
) {
    {
        let mut count = connections.lock().await;
        *count += 1;
    }

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ConnCmd::Send(frame)) => {
                        if write.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                    Some(ConnCmd::Close) | None => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        {
                            let mut msgs = messages.lock().await;
                            msgs.push_back(text.clone());
                        }

                        if is_ping(&text) {
                            let pong = serde_json::json!({"event": "pong"}).to_string();
                            if write.send(Message::Text(pong)).await.is_err() {
                                break;
                            }
                            continue;
                        }

                        // Ack subscriptions the way the venue does.
                        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&text) {
                            if parsed.get("op") == Some(&serde_json::json!("subscribe")) {
                                let ack = serde_json::json!({
                                    "event": "subscribe",
                                    "arg": parsed["args"][0],
                                });
                                let _ = write.send(Message::Text(ack.to_string())).await;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}

fn is_ping(text: &str) -> bool {
    if text.trim().eq_ignore_ascii_case("ping") {
        return true;
    }
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| v.get("op").and_then(|op| op.as_str()).map(|s| s == "ping"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockFeedServer::start().await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        server.shutdown().await;
    }
}
