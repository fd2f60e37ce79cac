// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI chat-completions provider for the Echoverse relay.
//!
//! Implements [`CompletionProvider`] on top of [`client::OpenAiClient`].

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use echoverse_config::model::OpenAiConfig;
use echoverse_core::{
    AdapterType, CompletionProvider, CompletionRequest, CompletionResponse, EchoverseError,
    HealthStatus, PluginAdapter,
};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{ChatCompletionRequest, ChatMessage};

/// Reply used when the API answers without any text.
pub const EMPTY_REPLY: &str = "I apologize, but I couldn't generate a response.";

/// OpenAI provider implementing [`CompletionProvider`].
///
/// API key resolution order: config -> `OPENAI_API_KEY` env var -> error.
pub struct OpenAiProvider {
    client: OpenAiClient,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
}

impl OpenAiProvider {
    /// Creates a provider from configuration.
    pub fn new(config: &OpenAiConfig) -> Result<Self, EchoverseError> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            EchoverseError::Config(
                "OpenAI API key not found: set openai.api_key or OPENAI_API_KEY".to_string(),
            )
        })?;

        let client = OpenAiClient::new(
            &api_key,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;

        info!(model = %config.model, endpoint = client.endpoint(), "OpenAI provider initialized");

        Ok(Self::with_client(client, config))
    }

    /// Creates a provider around an existing client.
    pub fn with_client(client: OpenAiClient, config: &OpenAiConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            system_prompt: config.system_prompt.clone(),
        }
    }

    /// Builds the chat messages for a completion request.
    ///
    /// The system prompt comes first, then each context entry as a prior user
    /// turn, then the prompt. A context ending with the prompt itself (the
    /// relay's history already holds the current message) is not repeated.
    fn to_chat_request(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        let mut context = request.context.as_slice();
        if context.last() == Some(&request.prompt) {
            context = &context[..context.len() - 1];
        }

        let mut messages = Vec::with_capacity(context.len() + 2);
        messages.push(ChatMessage::system(&self.system_prompt));
        messages.extend(context.iter().map(ChatMessage::user));
        messages.push(ChatMessage::user(&request.prompt));

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, EchoverseError> {
        // Health checks never call the API; a call would spend tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), EchoverseError> {
        debug!("OpenAI provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, EchoverseError> {
        let api_request = self.to_chat_request(&request);
        let response = self.client.complete(&api_request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "completion usage"
            );
        }

        let content = response.first_text().unwrap_or(EMPTY_REPLY).to_string();
        Ok(CompletionResponse {
            content,
            model: response.model,
        })
    }
}
