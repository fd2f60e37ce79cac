// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end relay testing.
//!
//! `RelayHarness` runs a real [`ChatGateway`] on `127.0.0.1:0` backed by a
//! [`MockProvider`], and provides WebSocket client helpers to drive it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use echoverse_core::{EchoverseError, PluginAdapter};
use echoverse_gateway::{ChatGateway, ChatRelay, GatewayConfig, RelaySettings};

use crate::mock_provider::MockProvider;

/// Client side of a relay connection.
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long the read helpers wait for the server.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Builder for creating relay test environments with configurable options.
pub struct RelayHarnessBuilder {
    provider: Option<MockProvider>,
    config: GatewayConfig,
}

impl RelayHarnessBuilder {
    fn new() -> Self {
        Self {
            provider: None,
            config: GatewayConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                bind_retries: 0,
                ..GatewayConfig::default()
            },
        }
    }

    /// Use `provider` instead of an echoing mock.
    pub fn with_provider(mut self, provider: MockProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Identify connections by `header` instead of `Sec-WebSocket-Key`.
    pub fn with_identity_header(mut self, header: &str) -> Self {
        self.config.identity_header = header.to_string();
        self
    }

    /// Serve the relay on `path` instead of `/`.
    pub fn with_relay_path(mut self, path: &str) -> Self {
        self.config.relay_path = path.to_string();
        self
    }

    pub fn with_settings(mut self, settings: RelaySettings) -> Self {
        self.config.relay = settings;
        self
    }

    /// Start the gateway and return the running harness.
    pub async fn start(self) -> Result<RelayHarness, EchoverseError> {
        let provider = Arc::new(self.provider.unwrap_or_else(MockProvider::echo));
        let relay_path = self.config.relay_path.clone();
        let gateway = ChatGateway::new(self.config, provider.clone())?;
        let addr = gateway.start().await?;
        Ok(RelayHarness {
            provider,
            gateway,
            addr,
            relay_path,
        })
    }
}

/// A running gateway with a mock provider.
pub struct RelayHarness {
    /// The mock completion provider behind the relay.
    pub provider: Arc<MockProvider>,
    gateway: ChatGateway,
    addr: SocketAddr,
    relay_path: String,
}

impl RelayHarness {
    /// Create a new builder for configuring the harness.
    pub fn builder() -> RelayHarnessBuilder {
        RelayHarnessBuilder::new()
    }

    /// Start a harness with an echoing provider and default settings.
    pub async fn start() -> Result<Self, EchoverseError> {
        Self::builder().start().await
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn relay(&self) -> &ChatRelay {
        self.gateway.relay()
    }

    /// `ws://` URL for `path` on this server.
    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Open a relay connection with a client-generated key.
    pub async fn connect(&self) -> Result<WsClient, tungstenite::Error> {
        self.connect_to(&self.relay_path, &[]).await
    }

    /// Open a relay connection whose `Sec-WebSocket-Key` is `key`.
    pub async fn connect_with_key(&self, key: &str) -> Result<WsClient, tungstenite::Error> {
        self.connect_to(&self.relay_path, &[("sec-websocket-key", key)]).await
    }

    /// Open a WebSocket to any path with extra handshake headers.
    pub async fn connect_to(
        &self,
        path: &str,
        headers: &[(&'static str, &str)],
    ) -> Result<WsClient, tungstenite::Error> {
        let mut request = self.ws_url(path).into_client_request()?;
        for (name, value) in headers {
            let value = HeaderValue::from_str(value).map_err(tungstenite::http::Error::from)?;
            request.headers_mut().insert(*name, value);
        }
        let (ws, _response) = tokio_tungstenite::connect_async(request).await?;
        Ok(ws)
    }

    pub async fn shutdown(&self) -> Result<(), EchoverseError> {
        self.gateway.shutdown().await
    }
}

impl Drop for RelayHarness {
    fn drop(&mut self) {
        self.gateway.shutdown_token().cancel();
    }
}

/// Next text frame from the server, or `None` if the connection closed first.
pub async fn next_text(ws: &mut WsClient) -> Option<String> {
    loop {
        let msg = tokio::time::timeout(READ_TIMEOUT, ws.next()).await.ok()??;
        match msg {
            Ok(Message::Text(text)) => return Some(text.as_str().to_owned()),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

/// True if the server closes the connection without sending any text frame.
pub async fn closes_silently(ws: &mut WsClient) -> bool {
    loop {
        match tokio::time::timeout(READ_TIMEOUT, ws.next()).await {
            Err(_) => return false,
            Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
            Ok(Some(Ok(Message::Text(_)))) => return false,
            Ok(Some(Ok(_))) => continue,
        }
    }
}
