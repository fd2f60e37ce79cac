// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway, and binds
//! the shared listener.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::HeaderName,
    middleware as axum_middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use echoverse_core::EchoverseError;

use crate::dispatch;
use crate::handlers;
use crate::relay::ChatRelay;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone, Debug)]
pub struct GatewayState {
    /// The chat relay serving upgraded sockets.
    pub relay: ChatRelay,
    /// Header whose value identifies a connection.
    pub identity_header: HeaderName,
}

impl GatewayState {
    pub fn new(relay: ChatRelay, identity_header: HeaderName) -> Self {
        Self {
            relay,
            identity_header,
        }
    }
}

/// Builds the full router.
///
/// - GET /api/health, POST /api/chat, POST /api/tutor, GET /api/relay/connections
/// - GET `relay_path` (WebSocket upgrade into the relay)
///
/// The upgrade dispatcher runs in front of every route, including the
/// fallback. Panics in any handler are turned into `500` responses.
pub fn build_router(state: GatewayState, relay_path: &str) -> Router {
    let api_routes = Router::new()
        .route("/api/health", get(handlers::get_health))
        .route("/api/chat", post(handlers::post_chat))
        .route("/api/tutor", post(handlers::post_tutor))
        .route("/api/relay/connections", get(handlers::get_relay_connections))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state.clone());

    let relay_routes = Router::new()
        .route(relay_path, get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .merge(api_routes)
        .merge(relay_routes)
        .layer(axum_middleware::from_fn_with_state(
            Arc::<str>::from(relay_path),
            dispatch::upgrade_dispatcher,
        ))
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::new())
}

/// Binds `addr`, retrying while the address is in use.
///
/// Makes at most `retries + 1` attempts, `delay` apart. Any other bind error
/// fails immediately.
pub async fn bind_with_retry(
    addr: &str,
    retries: u32,
    delay: Duration,
) -> Result<TcpListener, EchoverseError> {
    let mut attempt = 0;
    loop {
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse && attempt < retries => {
                attempt += 1;
                tracing::warn!(%addr, attempt, retries, "address in use, retrying bind");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Err(EchoverseError::Transport {
                    message: format!("failed to bind gateway to {addr}: {e}"),
                    source: Some(Box::new(e)),
                });
            }
        }
    }
}

/// Serves `router` on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> Result<(), EchoverseError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Gateway server listening on {addr}");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| EchoverseError::Transport {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })
}
