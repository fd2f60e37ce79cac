// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket transport for the chat relay.
//!
//! Each socket runs three pieces:
//! 1. Writer task: drains the connection's outbound queue into the socket
//! 2. Processor task: runs conversation turns one frame at a time
//! 3. Reader loop: reads client frames into the processor's bounded queue
//!
//! The reader does not wait on a completion unless the inbound queue is full,
//! so a close is normally observed and the connection torn down while a turn
//! is still in flight. A full queue stops socket reads until the processor
//! catches up.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::relay::{ChatRelay, InboundFrame};
use crate::server::GatewayState;

/// WebSocket upgrade handler for the relay path.
///
/// Reads the connection identity from the configured header and upgrades.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<GatewayState>,
) -> Response {
    let identity = headers
        .get(&state.identity_header)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let relay = state.relay.clone();

    ws.on_failed_upgrade(|e| tracing::debug!(error = %e, "websocket upgrade failed"))
        .on_upgrade(move |socket| handle_socket(socket, relay, identity))
}

/// Serve one upgraded socket until it closes.
pub async fn handle_socket(socket: WebSocket, relay: ChatRelay, identity: Option<String>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (conn, mut outbound_rx) = match relay.accept(identity.as_deref()).await {
        Ok(accepted) => accepted,
        Err(e) => {
            tracing::debug!(error = %e, "closing websocket without opening");
            let _ = ws_sender.close().await;
            return;
        }
    };

    // Forward queued frames to the socket.
    let writer = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Sequential turns; replies go out in inbound order.
    let (frame_tx, mut frame_rx) =
        mpsc::channel::<InboundFrame>(relay.settings().inbound_buffer.max(1));
    {
        let relay = relay.clone();
        let conn = Arc::clone(&conn);
        tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                relay.handle_frame(&conn, frame).await;
            }
        });
    }

    while let Some(msg) = ws_receiver.next().await {
        let frame = match msg {
            Ok(Message::Text(text)) => InboundFrame::Text(text.as_str().to_owned()),
            Ok(Message::Binary(bytes)) => InboundFrame::Binary(bytes.to_vec()),
            Ok(Message::Close(_)) => break,
            // Ping/pong are answered by the protocol layer.
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(connection_id = %conn.id(), error = %e, "websocket read failed");
                break;
            }
        };
        if frame_tx.send(frame).await.is_err() {
            break;
        }
    }

    relay.close(&conn);
    drop(frame_tx);
    writer.abort();
}
