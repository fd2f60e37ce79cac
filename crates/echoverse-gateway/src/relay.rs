// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The chat relay: connection accept, per-frame conversation turns, teardown.
//!
//! A connection moves through `CONNECTING -> OPEN -> CLOSED`. [`ChatRelay::accept`]
//! performs the first transition (or rejects the handshake),
//! [`ChatRelay::handle_frame`] runs one turn while open, and
//! [`ChatRelay::close`] discards all state for the connection.
//!
//! The relay never cancels a completion call. A reply that resolves after
//! close is dropped by the liveness check in [`ChatRelay::deliver`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use echoverse_core::{CompletionProvider, CompletionRequest, ConnectionId, EchoverseError};

use crate::registry::{ConnectionHandle, ConnectionRegistry, ConversationStore};

/// Greeting sent once when a connection opens.
pub const DEFAULT_GREETING: &str = "Connected to Echoverse AI Assistant";

/// Reply sent when a frame cannot be answered.
pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "Sorry, I encountered an error processing your request.";

/// Reply sent when the completion service is rate limiting.
pub const DEFAULT_RATE_LIMITED_MESSAGE: &str =
    "I apologize, but our AI service is currently at capacity. Please try again in a moment.";

/// Relay behaviour settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    pub greeting: String,
    pub fallback_message: String,
    pub rate_limited_message: String,
    /// Capacity of each connection's inbound frame queue.
    pub inbound_buffer: usize,
    /// Capacity of each connection's outbound frame queue.
    pub outbound_buffer: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
            rate_limited_message: DEFAULT_RATE_LIMITED_MESSAGE.to_string(),
            inbound_buffer: 32,
            outbound_buffer: 64,
        }
    }
}

/// A data frame read from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
}

impl InboundFrame {
    /// Decodes the frame payload as text. Binary frames must be valid UTF-8.
    pub fn decode(self) -> Result<String, EchoverseError> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Binary(bytes) => String::from_utf8(bytes).map_err(|e| EchoverseError::Transport {
                message: "binary frame is not valid UTF-8".to_string(),
                source: Some(Box::new(e)),
            }),
        }
    }
}

/// What happened to one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The completion reply was sent.
    Replied,
    /// The fallback message was sent.
    Fallback,
    /// The provider was rate limited; the rate-limit message was sent.
    RateLimited,
    /// The connection was closed; nothing was sent.
    Discarded,
}

/// Diagnostics view of one live connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionSummary {
    pub id: String,
    pub opened_at: DateTime<Utc>,
    /// Messages received so far.
    pub messages: usize,
}

/// Shared relay state. Cheap to clone.
#[derive(Clone)]
pub struct ChatRelay {
    provider: Arc<dyn CompletionProvider>,
    registry: Arc<ConnectionRegistry>,
    store: Arc<ConversationStore>,
    settings: Arc<RelaySettings>,
}

impl ChatRelay {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: RelaySettings) -> Self {
        Self {
            provider,
            registry: Arc::new(ConnectionRegistry::new()),
            store: Arc::new(ConversationStore::new()),
            settings: Arc::new(settings),
        }
    }

    pub fn provider(&self) -> &Arc<dyn CompletionProvider> {
        &self.provider
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Opens a connection identified by `identity`.
    ///
    /// Registers an empty history and the connection handle, then queues the
    /// greeting. Returns the handle and the receiving end of its outbound
    /// queue, which the socket writer drains.
    ///
    /// Fails with [`EchoverseError::Handshake`] when the identity is absent or
    /// empty, or when a connection with the same identity is already open.
    pub async fn accept(
        &self,
        identity: Option<&str>,
    ) -> Result<(Arc<ConnectionHandle>, mpsc::Receiver<String>), EchoverseError> {
        let id = identity
            .filter(|value| !value.is_empty())
            .map(ConnectionId::from)
            .ok_or_else(|| EchoverseError::Handshake {
                reason: "missing identity header".to_string(),
            })?;

        let (tx, rx) = mpsc::channel(self.settings.outbound_buffer.max(1));
        let conn = Arc::new(ConnectionHandle::new(id, tx));
        self.registry.register(Arc::clone(&conn))?;
        self.store.open(&conn);

        tracing::info!(connection_id = %conn.id(), "client connected");
        conn.send(self.settings.greeting.clone()).await?;
        Ok((conn, rx))
    }

    /// Runs one conversation turn for `frame`.
    ///
    /// The decoded text is appended to the connection's history, and the
    /// completion provider is called with the text plus the full history as
    /// context. Rate limiting is answered with the rate-limit message, any
    /// other failure with the fallback message. The connection stays open.
    pub async fn handle_frame(&self, conn: &ConnectionHandle, frame: InboundFrame) -> FrameOutcome {
        if !self.registry.is_current(conn) {
            return FrameOutcome::Discarded;
        }

        let text = match frame.decode() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(connection_id = %conn.id(), error = %e, "failed to decode frame");
                return self.send_fallback(conn).await;
            }
        };

        let Some(context) = self.store.append(conn, text.clone()) else {
            return FrameOutcome::Discarded;
        };

        tracing::debug!(
            connection_id = %conn.id(),
            history_len = context.len(),
            "requesting completion"
        );
        let request = CompletionRequest::new(text).with_context(context);
        match self.provider.complete(request).await {
            Ok(response) => {
                if self.deliver(conn, response.content).await {
                    FrameOutcome::Replied
                } else {
                    FrameOutcome::Discarded
                }
            }
            Err(EchoverseError::RateLimited { message }) => {
                tracing::warn!(connection_id = %conn.id(), %message, "completion rate limited");
                let text = self.settings.rate_limited_message.clone();
                if self.deliver(conn, text).await {
                    FrameOutcome::RateLimited
                } else {
                    FrameOutcome::Discarded
                }
            }
            Err(e) => {
                if e.is_provider_failure() {
                    tracing::warn!(connection_id = %conn.id(), error = %e, "completion failed");
                } else {
                    tracing::error!(connection_id = %conn.id(), error = %e, "completion failed");
                }
                self.send_fallback(conn).await
            }
        }
    }

    async fn send_fallback(&self, conn: &ConnectionHandle) -> FrameOutcome {
        if self.deliver(conn, self.settings.fallback_message.clone()).await {
            FrameOutcome::Fallback
        } else {
            FrameOutcome::Discarded
        }
    }

    /// Sends `text` if `conn` is still the open registration for its id.
    ///
    /// Returns false, without sending, once the connection has closed.
    pub async fn deliver(&self, conn: &ConnectionHandle, text: String) -> bool {
        if !self.registry.is_current(conn) || !conn.is_transport_open() {
            tracing::debug!(connection_id = %conn.id(), "connection closed, dropping reply");
            return false;
        }
        match conn.send(text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(connection_id = %conn.id(), error = %e, "dropping reply");
                false
            }
        }
    }

    /// Tears down `conn`: removes it from the registry and discards its history.
    ///
    /// Has no effect on a later connection that reuses the same id.
    pub fn close(&self, conn: &ConnectionHandle) {
        self.registry.remove(conn);
        let messages = self.store.remove(conn).map_or(0, |history| history.len());
        tracing::info!(connection_id = %conn.id(), messages, "client disconnected");
    }

    pub fn is_registered(&self, id: &ConnectionId) -> bool {
        self.registry.contains(id)
    }

    /// True if `conn` is the live registration for its id.
    pub fn is_current(&self, conn: &ConnectionHandle) -> bool {
        self.registry.is_current(conn)
    }

    pub fn history(&self, id: &ConnectionId) -> Option<Vec<String>> {
        self.store.history(id)
    }

    pub fn active_connections(&self) -> usize {
        self.registry.count()
    }

    /// Live connections, oldest first.
    pub fn connections(&self) -> Vec<ConnectionSummary> {
        let mut summaries: Vec<ConnectionSummary> = self
            .registry
            .snapshot()
            .into_iter()
            .map(|conn| ConnectionSummary {
                id: conn.id().to_string(),
                opened_at: conn.opened_at(),
                messages: self.store.message_count(conn.id()),
            })
            .collect();
        summaries.sort_by(|a, b| a.opened_at.cmp(&b.opened_at).then_with(|| a.id.cmp(&b.id)));
        summaries
    }
}

impl std::fmt::Debug for ChatRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRelay")
            .field("provider", &self.provider.name())
            .field("active_connections", &self.registry.count())
            .field("settings", &self.settings)
            .finish()
    }
}
