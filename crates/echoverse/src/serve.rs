// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `echoverse serve` command implementation.
//!
//! Wires the OpenAI provider into the gateway, starts the shared listener,
//! and runs until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use echoverse_config::EchoverseConfig;
use echoverse_core::{EchoverseError, PluginAdapter};
use echoverse_gateway::{ChatGateway, GatewayConfig, RelaySettings};
use echoverse_openai::OpenAiProvider;

use crate::shutdown;

/// Runs the `serve` command.
///
/// Refuses to start without an OpenAI API key. Supports graceful shutdown
/// via signal handlers.
pub async fn run_serve(config: EchoverseConfig) -> Result<(), EchoverseError> {
    init_tracing(&config.server.log_level);

    let provider = Arc::new(OpenAiProvider::new(&config.openai)?);
    let cancel = shutdown::install_signal_handler();

    let gateway = ChatGateway::new(gateway_config(&config), provider.clone())?
        .with_shutdown_token(cancel);
    let addr = gateway.start().await?;
    info!(%addr, "echoverse ready");

    gateway.wait().await?;
    provider.shutdown().await?;
    info!("echoverse stopped");
    Ok(())
}

/// Maps the `[server]` and `[relay]` sections onto the gateway's settings.
pub fn gateway_config(config: &EchoverseConfig) -> GatewayConfig {
    GatewayConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        bind_retries: config.server.bind_retries,
        bind_retry_delay: Duration::from_millis(config.server.bind_retry_delay_ms),
        relay_path: config.relay.path.clone(),
        identity_header: config.relay.identity_header.clone(),
        relay: RelaySettings {
            greeting: config.relay.greeting.clone(),
            fallback_message: config.relay.fallback_message.clone(),
            rate_limited_message: config.relay.rate_limited_message.clone(),
            inbound_buffer: config.relay.inbound_buffer,
            outbound_buffer: config.relay.outbound_buffer,
        },
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("echoverse={log_level},tower_http={log_level},warn"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::SinkExt;
    use serde_json::json;
    use tokio_tungstenite::tungstenite::Message;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use echoverse_test_utils::next_text;

    #[test]
    fn gateway_config_maps_sections() {
        let config = echoverse_config::load_and_validate_str(
            r#"
[server]
host = "127.0.0.1"
port = 8080
bind_retries = 5
bind_retry_delay_ms = 250

[relay]
path = "/chat"
identity_header = "X-Client-Id"
greeting = "hi there"
rate_limited_message = "busy"
inbound_buffer = 4
outbound_buffer = 8
"#,
        )
        .unwrap();

        let gw = gateway_config(&config);
        assert_eq!(gw.host, "127.0.0.1");
        assert_eq!(gw.port, 8080);
        assert_eq!(gw.bind_retries, 5);
        assert_eq!(gw.bind_retry_delay, Duration::from_millis(250));
        assert_eq!(gw.relay_path, "/chat");
        assert_eq!(gw.identity_header, "X-Client-Id");
        assert_eq!(gw.relay.greeting, "hi there");
        assert_eq!(gw.relay.fallback_message, config.relay.fallback_message);
        assert_eq!(gw.relay.rate_limited_message, "busy");
        assert_eq!(gw.relay.inbound_buffer, 4);
        assert_eq!(gw.relay.outbound_buffer, 8);
    }

    #[tokio::test]
    async fn openai_backed_relay_answers_over_websocket() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "model": "gpt-3.5-turbo",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Photosynthesis turns light into sugar."},
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = EchoverseConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.openai.api_key = Some("test-key".to_string());
        config.openai.base_url = server.uri();

        let provider = Arc::new(OpenAiProvider::new(&config.openai).unwrap());
        let gateway = ChatGateway::new(gateway_config(&config), provider).unwrap();
        let addr = gateway.start().await.unwrap();

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
            .await
            .unwrap();
        assert_eq!(
            next_text(&mut ws).await.as_deref(),
            Some(config.relay.greeting.as_str())
        );

        ws.send(Message::text("What is photosynthesis?")).await.unwrap();
        assert_eq!(
            next_text(&mut ws).await.as_deref(),
            Some("Photosynthesis turns light into sugar.")
        );

        gateway.shutdown().await.unwrap();
    }
}
