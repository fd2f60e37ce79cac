// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Upgrade dispatcher for the shared listener.
//!
//! Upgrade requests for the relay path are handed to the relay. Upgrade
//! requests for any other path are terminated with an empty `404` carrying
//! `Connection: close`; no upgrade happens. Everything else passes through to
//! the ordinary routes.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Routing decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Upgrade request for the relay path.
    Relay,
    /// Upgrade request for any other path.
    Reject,
    /// Not an upgrade request.
    PassThrough,
}

/// True if the request asks for a protocol upgrade
/// (`Connection` lists `upgrade` and an `Upgrade` header is present).
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));
    connection_upgrade && headers.contains_key(header::UPGRADE)
}

/// Decides what to do with a request. Depends only on headers and path.
pub fn decide(headers: &HeaderMap, path: &str, relay_path: &str) -> Dispatch {
    if !is_upgrade_request(headers) {
        Dispatch::PassThrough
    } else if path == relay_path {
        Dispatch::Relay
    } else {
        Dispatch::Reject
    }
}

/// Middleware applying [`decide`] in front of every route.
pub async fn upgrade_dispatcher(
    State(relay_path): State<Arc<str>>,
    request: Request,
    next: Next,
) -> Response {
    match decide(request.headers(), request.uri().path(), &relay_path) {
        Dispatch::Reject => {
            tracing::debug!(path = %request.uri().path(), "rejecting upgrade request");
            (StatusCode::NOT_FOUND, [(header::CONNECTION, "close")]).into_response()
        }
        Dispatch::Relay | Dispatch::PassThrough => next.run(request).await,
    }
}
