// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Echoverse chat relay.
//!
//! This crate provides the trait definitions, error type, and common types
//! shared by the gateway, the completion adapters, and the binary.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::EchoverseError;
pub use traits::{CompletionProvider, PluginAdapter};
pub use types::{
    AdapterType, CompletionRequest, CompletionResponse, ConnectionId, HealthStatus,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoverse_error_messages() {
        let err = EchoverseError::Config("missing key".into());
        assert_eq!(err.to_string(), "configuration error: missing key");

        let err = EchoverseError::provider("boom");
        assert_eq!(err.to_string(), "provider error: boom");

        let err = EchoverseError::Handshake {
            reason: "missing identity header".into(),
        };
        assert!(err.to_string().contains("missing identity header"));

        let err = EchoverseError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn provider_failures_are_classified() {
        assert!(EchoverseError::provider("x").is_provider_failure());
        assert!(
            EchoverseError::RateLimited {
                message: "slow down".into()
            }
            .is_provider_failure()
        );
        assert!(!EchoverseError::Internal("x".into()).is_provider_failure());
        assert!(
            !EchoverseError::Handshake {
                reason: "x".into()
            }
            .is_provider_failure()
        );
    }

    #[test]
    fn adapter_type_display_round_trip() {
        use std::str::FromStr;

        for variant in [AdapterType::Gateway, AdapterType::Provider] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn connection_id_conversions() {
        let a = ConnectionId::from("K1");
        let b = ConnectionId::from("K1".to_string());
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "K1");
        assert_eq!(a.to_string(), "K1");
    }

    #[test]
    fn completion_request_builder() {
        let req = CompletionRequest::new("bye").with_context(vec!["hello".into(), "bye".into()]);
        assert_eq!(req.prompt, "bye");
        assert_eq!(req.context, vec!["hello", "bye"]);

        let bare = CompletionRequest::new("hi");
        assert!(bare.context.is_empty());
    }

    #[test]
    fn completion_request_context_defaults_when_absent() {
        let req: CompletionRequest = serde_json::from_str(r#"{"prompt":"hi"}"#).unwrap();
        assert!(req.context.is_empty());
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_completion_provider<T: CompletionProvider>() {}
    }
}
