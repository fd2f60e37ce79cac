// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway hosting the Echoverse chat relay.
//!
//! One listener serves both the REST API and the relay. Upgrade requests for
//! the relay path become relay connections; upgrade requests for any other
//! path are terminated; everything else goes to the REST routes.

pub mod dispatch;
pub mod handlers;
pub mod registry;
pub mod relay;
pub mod server;
pub mod ws;

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderName;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use echoverse_core::types::{AdapterType, HealthStatus};
use echoverse_core::{CompletionProvider, EchoverseError, PluginAdapter};

pub use relay::{ChatRelay, ConnectionSummary, FrameOutcome, InboundFrame, RelaySettings};

use crate::server::GatewayState;

/// Gateway configuration.
///
/// Mirrors the `[server]` and `[relay]` sections from `echoverse-config` to
/// avoid a dependency on the config crate from the gateway crate.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind (0 picks a free port).
    pub port: u16,
    /// Extra bind attempts while the address is in use.
    pub bind_retries: u32,
    /// Pause between bind attempts.
    pub bind_retry_delay: Duration,
    /// Path accepting relay upgrades.
    pub relay_path: String,
    /// Header whose value identifies a connection.
    pub identity_header: String,
    pub relay: RelaySettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            bind_retries: 3,
            bind_retry_delay: Duration::from_secs(1),
            relay_path: "/ws".to_string(),
            identity_header: "sec-websocket-key".to_string(),
            relay: RelaySettings::default(),
        }
    }
}

impl GatewayConfig {
    fn bind_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// The gateway server as a pluggable adapter.
///
/// [`ChatGateway::start`] binds the listener and runs the axum server as a
/// background task until the shutdown token is cancelled.
pub struct ChatGateway {
    config: GatewayConfig,
    relay: ChatRelay,
    identity_header: HeaderName,
    shutdown: CancellationToken,
    local_addr: OnceLock<SocketAddr>,
    server_handle: Mutex<Option<JoinHandle<Result<(), EchoverseError>>>>,
}

impl ChatGateway {
    /// Create a gateway relaying to `provider`.
    pub fn new(
        config: GatewayConfig,
        provider: Arc<dyn CompletionProvider>,
    ) -> Result<Self, EchoverseError> {
        let identity_header =
            HeaderName::from_bytes(config.identity_header.to_ascii_lowercase().as_bytes())
                .map_err(|e| {
                    EchoverseError::Config(format!(
                        "invalid identity header '{}': {e}",
                        config.identity_header
                    ))
                })?;
        let relay = ChatRelay::new(provider, config.relay.clone());
        Ok(Self {
            config,
            relay,
            identity_header,
            shutdown: CancellationToken::new(),
            local_addr: OnceLock::new(),
            server_handle: Mutex::new(None),
        })
    }

    /// Use `token` to stop the server instead of an internal one.
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn relay(&self) -> &ChatRelay {
        &self.relay
    }

    /// Address the listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Bind the listener and start serving in the background.
    pub async fn start(&self) -> Result<SocketAddr, EchoverseError> {
        let mut handle = self.server_handle.lock().await;
        if handle.is_some() {
            return Err(EchoverseError::Internal("gateway already started".to_string()));
        }

        let listener = server::bind_with_retry(
            &self.config.bind_addr(),
            self.config.bind_retries,
            self.config.bind_retry_delay,
        )
        .await?;
        let addr = listener.local_addr().map_err(|e| EchoverseError::Transport {
            message: format!("failed to read listener address: {e}"),
            source: Some(Box::new(e)),
        })?;
        let _ = self.local_addr.set(addr);

        let state = GatewayState::new(self.relay.clone(), self.identity_header.clone());
        let router = server::build_router(state, &self.config.relay_path);
        let shutdown = self.shutdown.clone();
        *handle = Some(tokio::spawn(server::serve(listener, router, shutdown)));

        tracing::info!(
            %addr,
            relay_path = %self.config.relay_path,
            identity_header = %self.identity_header,
            "gateway started"
        );
        Ok(addr)
    }

    /// Wait for the server task to finish (after the shutdown token fires).
    pub async fn wait(&self) -> Result<(), EchoverseError> {
        let handle = self.server_handle.lock().await.take();
        match handle {
            Some(handle) => handle
                .await
                .map_err(|e| EchoverseError::Internal(format!("gateway task failed: {e}")))?,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PluginAdapter for ChatGateway {
    fn name(&self) -> &str {
        "gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Gateway
    }

    async fn health_check(&self) -> Result<HealthStatus, EchoverseError> {
        let handle = self.server_handle.lock().await;
        match handle.as_ref() {
            Some(h) if !h.is_finished() => Ok(HealthStatus::Healthy),
            Some(_) => Ok(HealthStatus::Unhealthy("server stopped".to_string())),
            None => Ok(HealthStatus::Unhealthy("server not started".to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), EchoverseError> {
        self.shutdown.cancel();
        let mut handle = self.server_handle.lock().await;
        if let Some(h) = handle.take() {
            h.abort();
        }
        Ok(())
    }
}
