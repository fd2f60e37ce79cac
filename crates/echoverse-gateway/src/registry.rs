// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connection relay state: the connection registry and conversation store.
//!
//! Both maps are keyed by [`ConnectionId`]. Each registration also carries a
//! random token so that a connection which has already been torn down can
//! never touch the state of a later connection reusing the same identifier.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc;
use uuid::Uuid;

use echoverse_core::{ConnectionId, EchoverseError};

/// Send/close capability for one live connection.
#[derive(Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    token: Uuid,
    outbound: mpsc::Sender<String>,
    opened_at: DateTime<Utc>,
}

impl ConnectionHandle {
    /// Creates a handle around the connection's outbound frame queue.
    pub fn new(id: ConnectionId, outbound: mpsc::Sender<String>) -> Self {
        Self {
            id,
            token: Uuid::new_v4(),
            outbound,
            opened_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Distinguishes this registration from any other using the same id.
    pub fn token(&self) -> Uuid {
        self.token
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// False once the socket writer has gone away.
    pub fn is_transport_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Queues a text frame for the socket writer.
    pub(crate) async fn send(&self, text: String) -> Result<(), EchoverseError> {
        self.outbound
            .send(text)
            .await
            .map_err(|_| EchoverseError::Transport {
                message: format!("connection {} writer closed", self.id),
                source: None,
            })
    }
}

/// Live connections by identifier.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection. Fails if the identifier is already live.
    pub fn register(&self, handle: Arc<ConnectionHandle>) -> Result<(), EchoverseError> {
        match self.connections.entry(handle.id().clone()) {
            Entry::Occupied(_) => Err(EchoverseError::Handshake {
                reason: format!("connection {} is already open", handle.id()),
            }),
            Entry::Vacant(slot) => {
                slot.insert(handle);
                Ok(())
            }
        }
    }

    /// True if `handle` is the registration currently held for its id.
    pub fn is_current(&self, handle: &ConnectionHandle) -> bool {
        self.connections
            .get(handle.id())
            .is_some_and(|live| live.token() == handle.token())
    }

    /// Removes `handle`'s registration. A newer registration of the same id is left alone.
    pub fn remove(&self, handle: &ConnectionHandle) -> bool {
        self.connections
            .remove_if(handle.id(), |_, live| live.token() == handle.token())
            .is_some()
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Number of live connections.
    pub fn count(&self) -> usize {
        self.connections.len()
    }

    /// Handles of every live connection, in no particular order.
    pub fn snapshot(&self) -> Vec<Arc<ConnectionHandle>> {
        self.connections.iter().map(|e| Arc::clone(e.value())).collect()
    }
}

#[derive(Debug)]
struct Conversation {
    token: Uuid,
    messages: Vec<String>,
}

/// Inbound message history per connection.
///
/// History is append-only and unbounded for the lifetime of the connection.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: DashMap<ConnectionId, Conversation>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an empty history for `handle`.
    pub fn open(&self, handle: &ConnectionHandle) {
        self.conversations.insert(
            handle.id().clone(),
            Conversation {
                token: handle.token(),
                messages: Vec::new(),
            },
        );
    }

    /// Appends `text` and returns the full history including it.
    ///
    /// Returns `None` if `handle` no longer owns a history.
    pub fn append(&self, handle: &ConnectionHandle, text: String) -> Option<Vec<String>> {
        let mut entry = self.conversations.get_mut(handle.id())?;
        if entry.token != handle.token() {
            return None;
        }
        entry.messages.push(text);
        Some(entry.messages.clone())
    }

    pub fn history(&self, id: &ConnectionId) -> Option<Vec<String>> {
        self.conversations.get(id).map(|c| c.messages.clone())
    }

    pub fn message_count(&self, id: &ConnectionId) -> usize {
        self.conversations.get(id).map_or(0, |c| c.messages.len())
    }

    /// Discards `handle`'s history and returns it.
    pub fn remove(&self, handle: &ConnectionHandle) -> Option<Vec<String>> {
        self.conversations
            .remove_if(handle.id(), |_, c| c.token == handle.token())
            .map(|(_, c)| c.messages)
    }
}
