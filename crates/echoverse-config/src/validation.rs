// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that serde attributes cannot express.
//! All failures are collected; validation does not stop at the first one.

use crate::diagnostic::ConfigError;
use crate::model::EchoverseConfig;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &EchoverseConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("server.host must not be empty"));
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::validation(format!(
            "server.host `{host}` is not a valid IP address or hostname"
        )));
    }

    let path = config.relay.path.as_str();
    if !path.starts_with('/') {
        errors.push(ConfigError::validation(format!(
            "relay.path `{path}` must start with `/`"
        )));
    }
    if path == "/api" || path.starts_with("/api/") {
        errors.push(ConfigError::validation(format!(
            "relay.path `{path}` collides with the /api routes"
        )));
    }

    if !is_header_name(&config.relay.identity_header) {
        errors.push(ConfigError::validation(format!(
            "relay.identity_header `{}` is not a valid HTTP header name",
            config.relay.identity_header
        )));
    }

    if config.relay.greeting.is_empty() {
        errors.push(ConfigError::validation("relay.greeting must not be empty"));
    }

    if config.relay.fallback_message.is_empty() {
        errors.push(ConfigError::validation(
            "relay.fallback_message must not be empty",
        ));
    }

    if config.relay.rate_limited_message.is_empty() {
        errors.push(ConfigError::validation(
            "relay.rate_limited_message must not be empty",
        ));
    }

    if config.relay.inbound_buffer == 0 {
        errors.push(ConfigError::validation(
            "relay.inbound_buffer must be at least 1",
        ));
    }

    if config.relay.outbound_buffer == 0 {
        errors.push(ConfigError::validation(
            "relay.outbound_buffer must be at least 1",
        ));
    }

    let temperature = config.openai.temperature;
    if !(0.0..=2.0).contains(&temperature) {
        errors.push(ConfigError::validation(format!(
            "openai.temperature must be between 0.0 and 2.0, got {temperature}"
        )));
    }

    if config.openai.max_tokens == 0 {
        errors.push(ConfigError::validation(
            "openai.max_tokens must be at least 1",
        ));
    }

    if config.openai.timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "openai.timeout_secs must be at least 1",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// RFC 7230 token characters. Case is irrelevant; the gateway lowercases the name.
fn is_header_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}
