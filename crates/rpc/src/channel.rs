// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket transport for the RPC channel.
//!
//! At most one connection is accepted at a time; a concurrent handshake
//! attempt is rejected during the HTTP upgrade with an explanatory
//! reason, never queued. Inbound text frames are parsed as responses
//! and routed to the client's pending-request table.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request as HandshakeRequest, Response as HandshakeResponse,
};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info};

use tether_core::{Error, Result};

use crate::client::RpcClient;

/// Upper bound on inbound message and frame size. The remote can send a
/// whole server's file listing in a single response.
const MAX_MESSAGE_SIZE: usize = 14_900_000;

/// Reason returned to peers refused by single-connection admission.
const REJECT_REASON: &str = "only one client can connect at a time";

/// Binds the given address and runs the accept loop.
pub async fn listen(addr: SocketAddr, client: RpcClient) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {}", addr);
    serve(listener, client).await
}

/// Runs the accept loop on an already-bound listener.
///
/// Returns only on listener failure; per-connection errors are logged
/// and absorbed so one bad peer cannot stop the loop.
pub async fn serve(listener: TcpListener, client: RpcClient) -> Result<()> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let client = client.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, client).await {
                error!("connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

/// Handles one inbound TCP connection through handshake, admission, and
/// the frame loop.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    client: RpcClient,
) -> Result<()> {
    let admitted = client.try_claim_connection();

    let callback = |_request: &HandshakeRequest, response: HandshakeResponse| {
        if admitted {
            Ok(response)
        } else {
            let mut reject = ErrorResponse::new(Some(REJECT_REASON.to_string()));
            *reject.status_mut() = StatusCode::BAD_REQUEST;
            Err(reject)
        }
    };

    let config = WebSocketConfig::default()
        .max_message_size(Some(MAX_MESSAGE_SIZE))
        .max_frame_size(Some(MAX_MESSAGE_SIZE));

    let ws_stream =
        match tokio_tungstenite::accept_hdr_async_with_config(stream, callback, Some(config)).await
        {
            Ok(ws_stream) => ws_stream,
            Err(e) => {
                if admitted {
                    client.release_connection();
                    return Err(Error::Transport(e.to_string()));
                }
                info!("rejected connection from {}: {}", peer_addr, REJECT_REASON);
                return Ok(());
            }
        };

    info!("client connected from {}", peer_addr);

    let (mut sink, mut stream) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

    client.attach_connection(outbound_tx);
    client.notify_connected();

    let result = loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => client.route_response(text.as_str()),
                Some(Ok(Message::Close(_))) => {
                    info!("client {} disconnected", peer_addr);
                    break Ok(());
                }
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = sink.send(Message::Pong(data)).await {
                        break Err(Error::Transport(e.to_string()));
                    }
                }
                Some(Ok(other)) => {
                    // Binary, Pong, and raw frames carry no responses.
                    debug!("ignoring non-text frame from {}: {:?}", peer_addr, other);
                }
                Some(Err(e)) => break Err(Error::Transport(e.to_string())),
                None => {
                    info!("client {} stream ended", peer_addr);
                    break Ok(());
                }
            },

            outbound = outbound_rx.recv() => match outbound {
                Some(json) => {
                    if let Err(e) = sink.send(Message::text(json)).await {
                        break Err(Error::Transport(e.to_string()));
                    }
                }
                // All client handles dropped; nothing left to send.
                None => break Ok(()),
            },
        }
    };

    client.release_connection();
    result
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
