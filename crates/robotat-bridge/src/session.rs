// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 robotat.dev

//! Per-viewer WebSocket session.
//!
//! A session joins the hub on connect and leaves unconditionally on every
//! exit path, including transport errors, so the hub never accumulates dead
//! sinks. Outbound traffic is forwarded from the session's hub queue by a
//! dedicated task; inbound frames are parsed and dispatched to the hub.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::hub::BroadcastHub;

/// Random session ID.
///
/// The full UUID keys the hub membership map; an 8-char prefix would
/// collide across enough connects and silently orphan a viewer. Logs show
/// only the prefix.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Run one viewer session until disconnect.
pub async fn run(socket: WebSocket, hub: Arc<BroadcastHub>) {
    let session_id = new_session_id();
    let log_id = session_id[..8].to_string();
    let mut outbound = hub.join(&session_id);
    info!("[{}] viewer connected", log_id);

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Forward hub messages to the socket; compact JSON, keys in
    // construction order. A write failure is a disconnect.
    let forward_id = log_id.clone();
    let forward = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            match serde_json::to_string(&message) {
                Ok(json) => {
                    if ws_tx.send(Message::Text(json)).await.is_err() {
                        debug!("[{}] websocket send failed, closing", forward_id);
                        break;
                    }
                }
                Err(e) => {
                    error!("[{}] failed to serialize outbound message: {}", forward_id, e);
                }
            }
        }
    });

    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                hub.handle_request(&session_id, &text).await;
            }
            Ok(Message::Close(_)) => {
                info!("[{}] viewer closed connection", log_id);
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Binary(_)) => {
                warn!("[{}] binary frames not supported", log_id);
            }
            Err(e) => {
                error!("[{}] websocket error: {}", log_id, e);
                break;
            }
        }
    }

    hub.leave(&session_id);
    forward.abort();
    info!("[{}] viewer disconnected", log_id);
}
