// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handles GET /api/health, POST /api/chat, POST /api/tutor and
//! GET /api/relay/connections.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use echoverse_core::{CompletionRequest, EchoverseError};

use crate::relay::ConnectionSummary;
use crate::server::GatewayState;

/// Response body for GET /api/health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Response body for a successful completion.
#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub response: String,
}

/// Response body for GET /api/relay/connections.
#[derive(Debug, Serialize)]
pub struct ConnectionsResponse {
    pub active_connections: usize,
    pub connections: Vec<ConnectionSummary>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

fn error_response(status: StatusCode, error: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// The non-empty string `message` field of a JSON body, if any.
fn message_field(body: Result<Json<Value>, JsonRejection>) -> Option<String> {
    let Json(value) = body.ok()?;
    match value.get("message") {
        Some(Value::String(message)) if !message.is_empty() => Some(message.clone()),
        _ => None,
    }
}

fn reply_response(response: String) -> Response {
    (StatusCode::OK, Json(ReplyResponse { response })).into_response()
}

/// Runs one completion. Rate limiting is answered with the configured
/// capacity message instead of an error status.
async fn complete_once(
    state: &GatewayState,
    message: String,
    failure: &str,
    route: &'static str,
) -> Response {
    match state.relay.provider().complete(CompletionRequest::new(message)).await {
        Ok(reply) => reply_response(reply.content),
        Err(EchoverseError::RateLimited { message }) => {
            tracing::warn!(route, %message, "completion request rate limited");
            reply_response(state.relay.settings().rate_limited_message.clone())
        }
        Err(e) => {
            tracing::error!(route, error = %e, "completion request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, failure)
        }
    }
}

/// GET /api/health
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
    })
}

/// POST /api/chat
///
/// One-shot completion without conversation context.
pub async fn post_chat(
    State(state): State<GatewayState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Some(message) = message_field(body) else {
        return error_response(StatusCode::BAD_REQUEST, "Message is required");
    };
    complete_once(&state, message, "Failed to generate response", "chat").await
}

/// POST /api/tutor
pub async fn post_tutor(
    State(state): State<GatewayState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Some(message) = message_field(body) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Message is required and must be a string",
        );
    };
    complete_once(&state, message, "Failed to get tutor response", "tutor").await
}

/// GET /api/relay/connections
///
/// Diagnostics view of the live relay connections.
pub async fn get_relay_connections(State(state): State<GatewayState>) -> Json<ConnectionsResponse> {
    let connections = state.relay.connections();
    Json(ConnectionsResponse {
        active_connections: connections.len(),
        connections,
    })
}
