// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Echoverse integration tests.
//!
//! Provides a mock completion provider and a harness that runs the gateway
//! on an ephemeral port, for fast, deterministic, CI-runnable tests without
//! external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock completion provider with scripted, echo, failing, and gated replies
//! - [`RelayHarness`] - Live gateway on `127.0.0.1:0` with WebSocket client helpers

pub mod harness;
pub mod mock_provider;

pub use harness::{RelayHarness, WsClient, closes_silently, next_text};
pub use mock_provider::{CompletionGate, MockProvider, MockReply};
