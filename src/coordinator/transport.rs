//! Node transport: a length-delimited, ordered, reliable-while-connected
//! channel per node (spec §6), generalized from `network::p2p::P2PNode`
//! (TCP/WebSocket peer connections, `mpsc` channel fan-out) and
//! `network::protocol::NetworkMessage`'s envelope shape.
//!
//! Unlike the teacher's string-keyed `message_type` field, every
//! command/event here is a variant of the closed [`Message`] enum (spec
//! §9 "from dynamic-dispatch handlers to typed variants"); an unknown
//! wire payload deserializes to [`Message::Unknown`] rather than being
//! silently dropped.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::lifecycle::FinalResult;
use crate::secret_sharing::Share;

/// Coordinator-to-node commands and node-to-coordinator events, unified
/// into one wire payload type (spec §4.4 "Command set" / "Event set").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Initialize {
        computation_id: String,
        peer_addresses: Vec<(String, String)>,
    },
    Share {
        computation_id: String,
        shares: Vec<Share>,
    },
    Compute {
        computation_id: String,
    },
    Aggregate {
        computation_id: String,
    },
    Verify {
        computation_id: String,
        result: FinalResult,
    },
    Abort {
        computation_id: String,
        reason: String,
    },
    Status,
    Ping,

    Registration {
        node_id: String,
    },
    ShareNotification {
        computation_id: String,
        from_node: String,
    },
    Result {
        computation_id: String,
        shares: Option<Vec<Share>>,
        result: Option<FinalResult>,
        weight: f64,
    },
    VerificationResult {
        computation_id: String,
        verified: bool,
    },
    NodeError {
        computation_id: Option<String>,
        message: String,
    },
    Pong,

    /// Any payload this version of the protocol doesn't recognize.
    /// Never silently dropped, the event loop logs and counts it.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub message_id: String,
    pub in_reply_to: Option<String>,
    pub timestamp: u64,
    pub sender: String,
    #[serde(flatten)]
    pub payload: Message,
}

impl Envelope {
    pub fn command(sender: impl Into<String>, payload: Message) -> Self {
        Envelope {
            message_id: Uuid::new_v4().to_string(),
            in_reply_to: None,
            timestamp: super::node::now_millis(),
            sender: sender.into(),
            payload,
        }
    }

    pub fn reply(sender: impl Into<String>, in_reply_to: &str, payload: Message) -> Self {
        Envelope {
            message_id: Uuid::new_v4().to_string(),
            in_reply_to: Some(in_reply_to.to_string()),
            timestamp: super::node::now_millis(),
            sender: sender.into(),
            payload,
        }
    }
}

/// The coordinator's point-to-point channel to one node. `send`
/// delivers a command; `next_event` awaits the node's next frame
/// (reply or spontaneous event). Implementations must preserve send
/// order per node (spec §5 "Ordering").
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, node_id: &str, envelope: Envelope) -> Result<()>;
    async fn next_event(&self, node_id: &str) -> Result<Option<Envelope>>;
    async fn disconnect(&self, node_id: &str);
}

/// An in-process test double: every node has an inbound queue the test
/// harness pushes into directly with [`InMemoryTransport::deliver`],
/// standing in for a real socket. Mirrors the teacher's
/// `mpsc::unbounded_channel`-based fan-out in `network::p2p`.
#[derive(Default)]
pub struct InMemoryTransport {
    inboxes: Mutex<std::collections::HashMap<String, VecDeque<Envelope>>>,
    sent: Mutex<Vec<(String, Envelope)>>,
    connected: Mutex<std::collections::HashSet<String>>,
}

impl InMemoryTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(InMemoryTransport::default())
    }

    pub async fn connect(&self, node_id: &str) {
        self.connected.lock().await.insert(node_id.to_string());
    }

    /// Pushes an envelope into `node_id`'s inbox, as if the node had
    /// sent it to the coordinator.
    pub async fn deliver(&self, node_id: &str, envelope: Envelope) {
        self.inboxes
            .lock()
            .await
            .entry(node_id.to_string())
            .or_default()
            .push_back(envelope);
    }

    pub async fn sent_to(&self, node_id: &str) -> Vec<Envelope> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(id, _)| id == node_id)
            .map(|(_, e)| e.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, node_id: &str, envelope: Envelope) -> Result<()> {
        if !self.connected.lock().await.contains(node_id) {
            return Err(Error::NodeDisconnected {
                node_id: node_id.to_string(),
            });
        }
        self.sent.lock().await.push((node_id.to_string(), envelope));
        Ok(())
    }

    async fn next_event(&self, node_id: &str) -> Result<Option<Envelope>> {
        Ok(self
            .inboxes
            .lock()
            .await
            .get_mut(node_id)
            .and_then(|q| q.pop_front()))
    }

    async fn disconnect(&self, node_id: &str) {
        self.connected.lock().await.remove(node_id);
    }
}

/// One node's live socket: an outbound channel a writer task drains into
/// the sink, and an inbox a reader task fills from the stream, mirroring
/// the single-session wrapper shape of a tungstenite client session
/// (connect once, split into sink/stream, run both halves as
/// independent loops) generalized from one WebSocket per peer to one
/// per coordinator-tracked node.
struct NodeConnection {
    outbound: mpsc::UnboundedSender<Envelope>,
    inbox: Arc<Mutex<VecDeque<Envelope>>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Drop for NodeConnection {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

/// A real node transport: the coordinator dials out to each node's
/// registered `transport_address` (a `ws://` or `wss://` URL) and
/// exchanges [`Envelope`]s as JSON text frames. Unlike
/// [`InMemoryTransport`]'s test-only queue, a node must be dialed with
/// [`WebSocketTransport::connect`] before `send`/`next_event` will find
/// it.
#[derive(Default)]
pub struct WebSocketTransport {
    connections: Mutex<HashMap<String, NodeConnection>>,
}

impl WebSocketTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(WebSocketTransport::default())
    }

    /// Opens a WebSocket connection to `node_id` at `url`, replacing any
    /// existing connection for that node. The reader and writer tasks
    /// run for the lifetime of the connection; either exits silently on
    /// the first I/O error or close frame, leaving the node's entry in
    /// place so `send` surfaces `NodeDisconnected` on the next attempt
    /// rather than the background task panicking.
    pub async fn connect(&self, node_id: &str, url: &str) -> Result<()> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|err| Error::TransportError(format!("connecting to {node_id} at {url}: {err}")))?;
        let (mut sink, mut source) = stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Envelope>();
        let writer = tokio::spawn(async move {
            while let Some(envelope) = outbound_rx.recv().await {
                let text = match serde_json::to_string(&envelope) {
                    Ok(t) => t,
                    Err(err) => {
                        tracing::warn!(%err, "failed to encode outgoing envelope");
                        continue;
                    }
                };
                if sink.send(WsMessage::Text(text.into())).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let inbox = Arc::new(Mutex::new(VecDeque::new()));
        let inbox_for_reader = inbox.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => match serde_json::from_str::<Envelope>(&text) {
                        Ok(envelope) => inbox_for_reader.lock().await.push_back(envelope),
                        Err(err) => tracing::warn!(%err, "failed to decode inbound frame"),
                    },
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(%err, "websocket read error");
                        break;
                    }
                }
            }
        });

        self.connections.lock().await.insert(
            node_id.to_string(),
            NodeConnection {
                outbound: outbound_tx,
                inbox,
                reader,
                writer,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, node_id: &str, envelope: Envelope) -> Result<()> {
        let connections = self.connections.lock().await;
        let conn = connections.get(node_id).ok_or_else(|| Error::NodeDisconnected {
            node_id: node_id.to_string(),
        })?;
        conn.outbound.send(envelope).map_err(|_| Error::NodeDisconnected {
            node_id: node_id.to_string(),
        })
    }

    async fn next_event(&self, node_id: &str) -> Result<Option<Envelope>> {
        let connections = self.connections.lock().await;
        let Some(conn) = connections.get(node_id) else { return Ok(None) };
        Ok(conn.inbox.lock().await.pop_front())
    }

    async fn disconnect(&self, node_id: &str) {
        self.connections.lock().await.remove(node_id);
    }
}

/// Used by [`mpsc`]-backed transport drivers that bridge socket frames
/// onto the coordinator's event loop (the `tokio::sync::mpsc` channel
/// the teacher's `P2PNode` already fans incoming messages through).
pub type EventChannel = (mpsc::UnboundedSender<(String, Envelope)>, mpsc::UnboundedReceiver<(String, Envelope)>);

pub fn event_channel() -> EventChannel {
    mpsc::unbounded_channel()
}
