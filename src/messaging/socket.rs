//! WebSocket upgrade and per-socket event loop.
//!
//! # Data Flow
//! ```text
//! Client ──upgrade──▶ handshake: {"event":"connect","id":<uuid>}
//! Client ──{"event","data"}──▶ Hub::broadcast ──{"event","data","from"}──▶ other sockets
//! Shutdown ──▶ close frame (1001) ──▶ Client
//! ```
//!
//! # Design Decisions
//! - Text frames only; binary frames are ignored
//! - Ping/pong handled by the transport
//! - A malformed frame gets an error event, the socket stays open

use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::lifecycle::ShutdownSignal;
use crate::messaging::hub::Hub;

/// Frame clients send to publish an event.
#[derive(Debug, Deserialize)]
struct Incoming {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Clone)]
struct SocketState {
    hub: Arc<Hub>,
    shutdown: ShutdownSignal,
}

/// Router exposing the upgrade endpoint at `path` (with and without a trailing slash).
pub fn router(path: &str, hub: Arc<Hub>, shutdown: ShutdownSignal) -> Router {
    let base = match path.trim_end_matches('/') {
        "" => "/".to_string(),
        trimmed => trimmed.to_string(),
    };
    let mut router = Router::new().route(&base, get(upgrade));
    if base != "/" {
        router = router.route(&format!("{base}/"), get(upgrade));
    }
    router.with_state(SocketState { hub, shutdown })
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<SocketState>) -> Response {
    ws.on_upgrade(move |socket| run_socket(socket, state))
}

fn text_frame(value: Value) -> Message {
    Message::Text(value.to_string().into())
}

async fn run_socket(socket: WebSocket, state: SocketState) {
    let SocketState { hub, mut shutdown } = state;
    let id = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut inbox) = mpsc::unbounded_channel();

    if sink
        .send(text_frame(json!({ "event": "connect", "id": id })))
        .await
        .is_err()
    {
        return;
    }
    hub.join(id, outbox);
    if hub.verbosity() >= 1 {
        tracing::info!(socket_id = %id, connected = hub.len(), "Socket connected");
    }

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                let frame = CloseFrame {
                    code: close_code::AWAY,
                    reason: "server shutting down".into(),
                };
                let _ = sink.send(Message::Close(Some(frame))).await;
                break;
            }
            Some(message) = inbox.recv() => {
                if sink.send(message).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if hub.verbosity() >= 3 {
                        tracing::trace!(socket_id = %id, frame = %text.as_str(), "Frame received");
                    }
                    if let Some(reply) = handle_text(&hub, id, text.as_str()) {
                        if sink.send(reply).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(socket_id = %id, error = %e, "Socket read failed");
                    break;
                }
            }
        }
    }

    hub.leave(id);
    if hub.verbosity() >= 1 {
        tracing::info!(socket_id = %id, connected = hub.len(), "Socket disconnected");
    }
}

/// Relay a client event. Returns a direct reply for the sender, if any.
fn handle_text(hub: &Hub, from: Uuid, text: &str) -> Option<Message> {
    let Ok(incoming) = serde_json::from_str::<Incoming>(text) else {
        if hub.verbosity() >= 1 {
            tracing::warn!(socket_id = %from, "Malformed socket frame");
        }
        return Some(text_frame(
            json!({ "event": "error", "data": "malformed message" }),
        ));
    };

    let relayed = hub.broadcast(
        Some(from),
        &text_frame(json!({
            "event": incoming.event,
            "data": incoming.data,
            "from": from,
        })),
    );
    if hub.verbosity() >= 2 {
        tracing::debug!(socket_id = %from, event = %incoming.event, relayed, "Event relayed");
    }
    None
}
