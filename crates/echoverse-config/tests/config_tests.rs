// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Echoverse configuration system.

use echoverse_config::diagnostic::ConfigError;
use echoverse_config::{
    load_and_validate_path, load_and_validate_str, load_config_from_str, render_effective,
};

/// Valid TOML with every known field deserializes.
#[test]
fn full_toml_deserializes() {
    let toml = r#"
[server]
host = "127.0.0.1"
port = 8080
bind_retries = 5
bind_retry_delay_ms = 250
log_level = "debug"

[relay]
path = "/chat"
identity_header = "x-client-id"
greeting = "hello"
fallback_message = "oops"
outbound_buffer = 8

[openai]
api_key = "sk-test"
base_url = "http://localhost:9999/v1"
model = "gpt-4o-mini"
temperature = 0.2
max_tokens = 128
system_prompt = "Be brief."
timeout_secs = 10
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.bind_retries, 5);
    assert_eq!(config.server.bind_retry_delay_ms, 250);
    assert_eq!(config.server.log_level, "debug");
    assert_eq!(config.relay.path, "/chat");
    assert_eq!(config.relay.identity_header, "x-client-id");
    assert_eq!(config.relay.greeting, "hello");
    assert_eq!(config.relay.fallback_message, "oops");
    assert_eq!(config.relay.outbound_buffer, 8);
    assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.openai.base_url, "http://localhost:9999/v1");
    assert_eq!(config.openai.model, "gpt-4o-mini");
    assert_eq!(config.openai.max_tokens, 128);
    assert_eq!(config.openai.system_prompt, "Be brief.");
    assert_eq!(config.openai.timeout_secs, 10);
}

/// An empty document yields the compiled defaults.
#[test]
fn empty_toml_yields_defaults() {
    let config = load_and_validate_str("").expect("defaults should validate");
    assert_eq!(config.server.port, 5000);
    assert_eq!(config.relay.path, "/ws");
}

/// A misspelled key is reported with a suggestion.
#[test]
fn unknown_key_gets_suggestion() {
    let toml = r#"
[relay]
greting = "hi"
"#;
    let errors = load_and_validate_str(toml).expect_err("unknown key must be rejected");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion: Some(s), .. }
                if key == "greting" && s == "greeting"
        )
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

/// A value of the wrong type is reported as InvalidType.
#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[server]
port = "not a number"
"#;
    let errors = load_and_validate_str(toml).expect_err("wrong type must be rejected");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "got: {errors:?}"
    );
}

/// Unknown top-level sections are rejected.
#[test]
fn unknown_section_rejected() {
    let toml = r#"
[stripe]
secret = "x"
"#;
    assert!(load_and_validate_str(toml).is_err());
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_runs_after_parse() {
    let toml = r#"
[relay]
path = "no-slash"
"#;
    let errors = load_and_validate_str(toml).expect_err("invalid path must be rejected");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("relay.path")))
    );
}

/// An explicit config file is loaded and validated.
#[test]
fn explicit_path_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    std::fs::write(&path, "[relay]\ngreeting = \"from file\"\n").unwrap();

    let config = load_and_validate_path(&path).expect("file config should validate");
    assert_eq!(config.relay.greeting, "from file");
}

/// Unknown keys in an explicit file are reported.
#[test]
fn explicit_path_unknown_key_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    std::fs::write(&path, "[server]\nprot = 1\n").unwrap();

    let errors = load_and_validate_path(&path).expect_err("unknown key must be rejected");
    let reported = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion: Some(s), .. } if key == "prot" && s == "port")
    });
    assert!(reported, "got: {errors:?}");
}

/// The effective-config dump never leaks the API key.
#[test]
fn effective_config_redacts_api_key() {
    let config = load_config_from_str("[openai]\napi_key = \"sk-live-secret\"\n").unwrap();
    let rendered = render_effective(&config).unwrap();
    assert!(!rendered.contains("sk-live-secret"));
    assert!(rendered.contains("[redacted]"));
    assert!(rendered.contains("[relay]"));
}
