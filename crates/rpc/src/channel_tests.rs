// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Socket-level tests for admission control and the frame loop, using a
//! real listener and tokio-tungstenite clients standing in for the
//! remote peer.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::time::Duration;
use tether_core::protocol::{Request, Response};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite;

/// Binds a random port and runs the accept loop in the background.
async fn start_channel(client: &RpcClient) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let client = client.clone();
    tokio::spawn(async move {
        let _ = serve(listener, client).await;
    });

    format!("ws://{}", addr)
}

#[tokio::test]
async fn accepts_a_connection_and_fires_the_event_once() {
    let client = RpcClient::new();
    let url = start_channel(&client).await;
    let mut connected = client.subscribe_connected();

    let (_ws, _) = connect_async(&url).await.unwrap();

    timeout(Duration::from_secs(5), connected.recv())
        .await
        .expect("connected event")
        .unwrap();

    // No second event for the same connection.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(matches!(
        connected.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
    assert!(client.is_connected());
}

#[tokio::test]
async fn second_concurrent_connection_is_rejected() {
    let client = RpcClient::new();
    let url = start_channel(&client).await;
    let mut connected = client.subscribe_connected();

    let (_first, _) = connect_async(&url).await.unwrap();
    timeout(Duration::from_secs(5), connected.recv())
        .await
        .expect("connected event")
        .unwrap();

    match connect_async(&url).await {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 400);
        }
        Ok(_) => panic!("second connection should have been rejected"),
        Err(other) => panic!("expected HTTP rejection, got {:?}", other),
    }

    // The first connection is unaffected.
    assert!(client.is_connected());
}

#[tokio::test]
async fn call_round_trips_over_the_socket() {
    let client = RpcClient::new();
    let url = start_channel(&client).await;
    let mut connected = client.subscribe_connected();

    let (ws, _) = connect_async(&url).await.unwrap();
    timeout(Duration::from_secs(5), connected.recv())
        .await
        .expect("connected event")
        .unwrap();

    // Peer loop: answer getFileNames requests.
    let (mut sink, mut stream) = ws.split();
    tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            if let tungstenite::Message::Text(text) = message {
                let request = Request::from_json(text.as_str()).unwrap();
                assert_eq!(request.method, "getFileNames");
                let response = Response::result(request.id, json!(["a.js", "b.js"]));
                sink.send(tungstenite::Message::text(response.to_json().unwrap()))
                    .await
                    .unwrap();
            }
        }
    });

    let names = timeout(Duration::from_secs(5), client.get_file_names("home"))
        .await
        .expect("response")
        .unwrap();
    assert_eq!(names, vec!["a.js", "b.js"]);
}

#[tokio::test]
async fn slot_is_released_on_disconnect_and_a_new_peer_can_connect() {
    let client = RpcClient::new();
    let url = start_channel(&client).await;
    let mut connected = client.subscribe_connected();

    let (mut ws, _) = connect_async(&url).await.unwrap();
    timeout(Duration::from_secs(5), connected.recv())
        .await
        .expect("connected event")
        .unwrap();

    ws.close(None).await.unwrap();

    // Wait for the server side to notice and release the slot.
    for _ in 0..50 {
        if !client.is_connected() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(!client.is_connected());

    let (_ws2, _) = connect_async(&url).await.unwrap();
    timeout(Duration::from_secs(5), connected.recv())
        .await
        .expect("second connected event")
        .unwrap();
    assert!(client.is_connected());
}

#[tokio::test]
async fn call_before_any_connection_fails_fast() {
    let client = RpcClient::new();
    let _url = start_channel(&client).await;

    let result = client.get_all_servers().await;
    assert!(matches!(result, Err(tether_core::Error::NoConnection)));
}
