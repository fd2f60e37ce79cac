// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Greeting sent once on every successfully opened relay connection.
pub const DEFAULT_GREETING: &str = "Connected to Echoverse AI Assistant";

/// Reply sent when a frame cannot be answered.
pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "Sorry, I encountered an error processing your request.";

/// Reply sent when the completion service is rate limiting us.
pub const DEFAULT_RATE_LIMITED_MESSAGE: &str =
    "I apologize, but our AI service is currently at capacity. Please try again in a moment.";

/// System prompt prepended to every completion request.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are EchoTeacher, a helpful AI tutor. Provide clear, concise explanations.";

/// Top-level Echoverse configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EchoverseConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Chat relay settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// OpenAI completion settings.
    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// How many times to retry binding when the port is busy.
    #[serde(default = "default_bind_retries")]
    pub bind_retries: u32,

    /// Delay between bind attempts, in milliseconds.
    #[serde(default = "default_bind_retry_delay_ms")]
    pub bind_retry_delay_ms: u64,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bind_retries: default_bind_retries(),
            bind_retry_delay_ms: default_bind_retry_delay_ms(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_bind_retries() -> u32 {
    3
}

fn default_bind_retry_delay_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Chat relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// The single path accepted for WebSocket upgrades.
    #[serde(default = "default_relay_path")]
    pub path: String,

    /// Handshake header whose value becomes the connection identifier.
    #[serde(default = "default_identity_header")]
    pub identity_header: String,

    /// Text frame sent to every client right after the connection opens.
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Text frame sent when a message could not be answered.
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,

    /// Text frame sent when the completion service reports rate limiting.
    #[serde(default = "default_rate_limited_message")]
    pub rate_limited_message: String,

    /// Capacity of each connection's inbound frame queue. A full queue
    /// stops reading from the socket until a frame has been answered.
    #[serde(default = "default_inbound_buffer")]
    pub inbound_buffer: usize,

    /// Capacity of each connection's outbound frame queue.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            path: default_relay_path(),
            identity_header: default_identity_header(),
            greeting: default_greeting(),
            fallback_message: default_fallback_message(),
            rate_limited_message: default_rate_limited_message(),
            inbound_buffer: default_inbound_buffer(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

fn default_relay_path() -> String {
    "/ws".to_string()
}

fn default_identity_header() -> String {
    "sec-websocket-key".to_string()
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

fn default_fallback_message() -> String {
    DEFAULT_FALLBACK_MESSAGE.to_string()
}

fn default_rate_limited_message() -> String {
    DEFAULT_RATE_LIMITED_MESSAGE.to_string()
}

fn default_inbound_buffer() -> usize {
    32
}

fn default_outbound_buffer() -> usize {
    64
}

/// OpenAI chat-completions configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. `None` falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the API, without the `/chat/completions` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for every completion.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature (0.0-2.0).
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// System prompt sent ahead of the conversation.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: default_system_prompt(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt", &self.system_prompt)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl OpenAiConfig {
    /// Resolves the API key from config, then from `OPENAI_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    500
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}
