// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock completion provider for deterministic testing.
//!
//! `MockProvider` implements `CompletionProvider` with scripted replies,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, watch};

use echoverse_core::{
    AdapterType, CompletionProvider, CompletionRequest, CompletionResponse, EchoverseError,
    HealthStatus, PluginAdapter,
};

/// Text returned when the script is empty and no other default was chosen.
pub const DEFAULT_MOCK_REPLY: &str = "mock response";

/// One scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Reply with fixed text.
    Text(String),
    /// Reply with the request's prompt.
    Echo,
    /// Fail with a provider error carrying this message.
    Fail(String),
    /// Fail with a rate-limit error carrying this message.
    RateLimited(String),
}

/// Holds one completion call until released.
#[derive(Debug, Clone)]
pub struct CompletionGate {
    notify: Arc<Notify>,
}

impl CompletionGate {
    /// Lets the held completion finish.
    pub fn release(&self) {
        self.notify.notify_one();
    }
}

/// A mock completion provider that returns scripted replies.
///
/// Replies are popped from a FIFO queue. When the queue is empty, the
/// provider falls back to its default reply (`"mock response"` unless built
/// with [`MockProvider::echo`], [`MockProvider::failing`] or
/// [`MockProvider::rate_limited`]).
pub struct MockProvider {
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    gates: Mutex<VecDeque<CompletionGate>>,
    calls: Mutex<Vec<CompletionRequest>>,
    call_count: watch::Sender<usize>,
}

impl MockProvider {
    /// Create a new mock provider with an empty script.
    pub fn new() -> Self {
        Self::with_fallback(MockReply::Text(DEFAULT_MOCK_REPLY.to_string()))
    }

    /// A provider that echoes every prompt back.
    pub fn echo() -> Self {
        Self::with_fallback(MockReply::Echo)
    }

    /// A provider whose every call fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_fallback(MockReply::Fail(message.into()))
    }

    /// A provider whose every call is rate limited.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::with_fallback(MockReply::RateLimited(message.into()))
    }

    /// Create a mock provider pre-loaded with the given text replies.
    pub fn with_responses(responses: Vec<String>) -> Self {
        let mut provider = Self::new();
        *provider.script.get_mut() = responses.into_iter().map(MockReply::Text).collect();
        provider
    }

    /// Create a mock provider pre-loaded with the given replies.
    pub fn with_script(script: Vec<MockReply>) -> Self {
        let mut provider = Self::new();
        *provider.script.get_mut() = script.into();
        provider
    }

    fn with_fallback(fallback: MockReply) -> Self {
        let (call_count, _) = watch::channel(0);
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            gates: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            call_count,
        }
    }

    /// Add a reply to the end of the script.
    pub async fn push(&self, reply: MockReply) {
        self.script.lock().await.push_back(reply);
    }

    /// Holds the next unheld completion call until the returned gate is released.
    ///
    /// The call is still recorded (and counted by [`Self::wait_for_calls`])
    /// before it blocks.
    pub async fn hold_next(&self) -> CompletionGate {
        let gate = CompletionGate {
            notify: Arc::new(Notify::new()),
        };
        self.gates.lock().await.push_back(gate.clone());
        gate
    }

    /// Every request received so far, in arrival order.
    pub async fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().await.clone()
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        *self.call_count.borrow()
    }

    /// Waits until at least `n` requests have been received.
    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.call_count.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|count| *count >= n).await;
    }

    async fn next_reply(&self) -> MockReply {
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, EchoverseError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), EchoverseError> {
        Ok(())
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, EchoverseError> {
        self.calls.lock().await.push(request.clone());
        self.call_count.send_modify(|count| *count += 1);

        let gate = self.gates.lock().await.pop_front();
        if let Some(gate) = gate {
            gate.notify.notified().await;
        }

        match self.next_reply().await {
            MockReply::Text(text) => Ok(CompletionResponse {
                content: text,
                model: Some("mock-model".to_string()),
            }),
            MockReply::Echo => Ok(CompletionResponse {
                content: request.prompt,
                model: Some("mock-model".to_string()),
            }),
            MockReply::Fail(message) => Err(EchoverseError::provider(message)),
            MockReply::RateLimited(message) => Err(EchoverseError::RateLimited { message }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn default_response_when_queue_empty() {
        let provider = MockProvider::new();
        let resp = provider.complete(CompletionRequest::new("hi")).await.unwrap();
        assert_eq!(resp.content, "mock response");
    }

    #[tokio::test]
    async fn queued_responses_returned_in_order() {
        let provider = MockProvider::with_responses(vec![
            "first".to_string(),
            "second".to_string(),
        ]);
        let req = || CompletionRequest::new("hi");

        assert_eq!(provider.complete(req()).await.unwrap().content, "first");
        assert_eq!(provider.complete(req()).await.unwrap().content, "second");
        // Queue exhausted, falls back to default
        assert_eq!(provider.complete(req()).await.unwrap().content, "mock response");
    }

    #[tokio::test]
    async fn echo_returns_prompt() {
        let provider = MockProvider::echo();
        let resp = provider
            .complete(CompletionRequest::new("hello").with_context(vec!["hello".into()]))
            .await
            .unwrap();
        assert_eq!(resp.content, "hello");
    }

    #[tokio::test]
    async fn scripted_failure_then_recovery() {
        let provider = MockProvider::echo();
        provider.push(MockReply::Fail("boom".into())).await;

        let err = provider.complete(CompletionRequest::new("a")).await.unwrap_err();
        assert!(matches!(err, EchoverseError::Provider { .. }));
        assert_eq!(provider.complete(CompletionRequest::new("b")).await.unwrap().content, "b");
    }

    #[tokio::test]
    async fn failing_provider_always_errors() {
        let provider = MockProvider::failing("down");
        for _ in 0..3 {
            assert!(provider.complete(CompletionRequest::new("x")).await.is_err());
        }
    }

    #[tokio::test]
    async fn rate_limited_reply_maps_to_rate_limited_error() {
        let provider = MockProvider::with_script(vec![MockReply::RateLimited("quota".into())]);
        let err = provider.complete(CompletionRequest::new("a")).await.unwrap_err();
        assert!(matches!(err, EchoverseError::RateLimited { ref message } if message == "quota"));

        let provider = MockProvider::rate_limited("busy");
        for _ in 0..2 {
            let err = provider.complete(CompletionRequest::new("x")).await.unwrap_err();
            assert!(matches!(err, EchoverseError::RateLimited { .. }));
        }
    }

    #[tokio::test]
    async fn calls_are_recorded() {
        let provider = MockProvider::new();
        provider.complete(CompletionRequest::new("one")).await.unwrap();
        provider
            .complete(CompletionRequest::new("two").with_context(vec!["one".into(), "two".into()]))
            .await
            .unwrap();

        let calls = provider.calls().await;
        assert_eq!(provider.call_count(), 2);
        assert_eq!(calls[0].prompt, "one");
        assert_eq!(calls[1].context, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn gate_holds_completion_until_released() {
        let provider = Arc::new(MockProvider::echo());
        let gate = provider.hold_next().await;

        let task = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.complete(CompletionRequest::new("held")).await })
        };

        provider.wait_for_calls(1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!task.is_finished());

        gate.release();
        let resp = task.await.unwrap().unwrap();
        assert_eq!(resp.content, "held");
    }
}
