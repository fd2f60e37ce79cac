// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Echoverse chat relay.

use thiserror::Error;

/// The primary error type used across the relay, its adapters, and the server.
#[derive(Debug, Error)]
pub enum EchoverseError {
    /// Configuration errors (invalid values, missing API keys, bad header values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Completion provider errors (API failure, malformed response).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The completion provider refused the request because of rate limiting.
    #[error("provider rate limited: {message}")]
    RateLimited { message: String },

    /// A WebSocket handshake was rejected before the connection opened.
    #[error("handshake rejected: {reason}")]
    Handshake { reason: String },

    /// Transport errors (bind failure, socket I/O, frame decoding).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EchoverseError {
    /// Shorthand for a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if the error came from the completion provider.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::RateLimited { .. } | Self::Timeout { .. })
    }
}
