//! WebSocket messaging tests on the shared listener.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

mod common;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn next_json(client: &mut Client) -> Value {
    let message = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for frame")
        .expect("stream ended")
        .expect("socket error");
    serde_json::from_str(message.to_text().unwrap()).unwrap()
}

async fn connect(server: &common::TestServer) -> (Client, String) {
    let (mut client, _) = connect_async(server.ws_url("/socket.io")).await.unwrap();
    let hello = next_json(&mut client).await;
    assert_eq!(hello["event"], "connect");
    let id = hello["id"].as_str().unwrap().to_string();
    (client, id)
}

#[tokio::test]
async fn connect_handshake() {
    let server = common::start("").await;

    let (_client, id) = connect(&server).await;
    assert_eq!(id.len(), 36);

    // Trailing slash variant is accepted too.
    let (mut client, _) = connect_async(server.ws_url("/socket.io/")).await.unwrap();
    assert_eq!(next_json(&mut client).await["event"], "connect");

    server.stop().await;
}

#[tokio::test]
async fn events_relay_to_other_sockets() {
    let server = common::start("").await;

    let (mut alice, alice_id) = connect(&server).await;
    let (mut bob, _) = connect(&server).await;

    alice
        .send(Message::text(r#"{"event":"chat","data":{"text":"hi"}}"#))
        .await
        .unwrap();

    let relayed = next_json(&mut bob).await;
    assert_eq!(
        relayed,
        json!({"event": "chat", "data": {"text": "hi"}, "from": alice_id})
    );

    alice.send(Message::text("garbage")).await.unwrap();
    assert_eq!(
        next_json(&mut alice).await,
        json!({"event": "error", "data": "malformed message"})
    );

    server.stop().await;
}

#[tokio::test]
async fn stop_closes_sockets() {
    let server = common::start("").await;
    let (mut client, _) = connect(&server).await;

    server.stop().await;

    let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for close");
    match frame {
        Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {}
        Some(Ok(other)) => panic!("expected close, got {other:?}"),
    }
}

#[tokio::test]
async fn disabled_messaging_rejects_upgrade() {
    let server = common::start("[socket-io]\nenabled = false").await;

    assert!(connect_async(server.ws_url("/socket.io")).await.is_err());

    server.stop().await;
}

#[tokio::test]
async fn custom_path() {
    let server = common::start("[socket-io]\npath = \"/events\"").await;

    let (mut client, _) = connect_async(server.ws_url("/events")).await.unwrap();
    assert_eq!(next_json(&mut client).await["event"], "connect");
    assert!(connect_async(server.ws_url("/socket.io")).await.is_err());

    server.stop().await;
}
