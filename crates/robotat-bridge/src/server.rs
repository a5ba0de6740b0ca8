// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 robotat.dev

//! HTTP/WebSocket surface of the bridge.
//!
//! - `GET /ws` — viewer WebSocket upgrade (rejected with 503 at capacity)
//! - `POST /api/command` — command submission for non-WebSocket callers
//! - `GET /health` — liveness and connection info

use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::broker::BrokerClient;
use crate::hub::BroadcastHub;
use crate::session;

/// Shared application state.
pub struct AppState {
    pub hub: Arc<BroadcastHub>,
    pub broker: Arc<BrokerClient>,
    pub max_clients: usize,
}

/// Build the axum router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/command", post(command_handler))
        .route("/health", get(health_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    if state.hub.session_count() >= state.max_clients {
        warn!("viewer rejected: max clients reached");
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    }

    let hub = Arc::clone(&state.hub);
    ws.on_upgrade(move |socket| session::run(socket, hub))
        .into_response()
}

/// Command submission: the same contract the hub enforces for WebSocket
/// viewers. Accepts any object carrying a `pid`; forwards it verbatim and
/// reports only whether the publish call succeeded.
async fn command_handler(
    State(state): State<Arc<AppState>>,
    Json(packet): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !packet.is_object() || packet.get("pid").is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid command packet: missing 'pid' field"})),
        );
    }

    match state.broker.publish_command(&packet) {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ok"}))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("could not send command: {e}")})),
        ),
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "broker": format!("{:?}", state.broker.state()),
        "clients": state.hub.session_count(),
        "max_clients": state.max_clients,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::topics::TopicRegistry;
    use serde_json::json;

    fn test_state() -> Arc<AppState> {
        let config = BridgeConfig::default();
        let topics = Arc::new(TopicRegistry::new());
        let (broker, _supervisor, _rx) = BrokerClient::new(&config, Arc::clone(&topics));
        let hub = Arc::new(BroadcastHub::new(topics, Arc::clone(&broker), 16));
        Arc::new(AppState {
            hub,
            broker,
            max_clients: 2,
        })
    }

    #[tokio::test]
    async fn command_without_pid_is_a_bad_request() {
        let state = test_state();
        let (status, Json(body)) =
            command_handler(State(state), Json(json!({"speed": 3}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().expect("error").contains("pid"));
    }

    #[tokio::test]
    async fn non_object_command_is_a_bad_request() {
        let state = test_state();
        let (status, _) = command_handler(State(state), Json(json!([1, 2, 3]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn publish_failure_maps_to_server_error() {
        // Broker never connects in tests, so the publish call fails.
        let state = test_state();
        let (status, Json(body)) =
            command_handler(State(state), Json(json!({"pid": 11}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().expect("error").contains("not connected"));
    }
}
