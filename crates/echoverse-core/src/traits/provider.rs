// SPDX-FileCopyrightText: 2026 Echoverse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion provider trait for LLM text generation.

use async_trait::async_trait;

use crate::error::EchoverseError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CompletionRequest, CompletionResponse};

/// Adapter for the external text-generation service.
///
/// The relay treats implementations as an opaque request/response function:
/// a prompt plus ordered context goes in, reply text or an error comes out.
#[async_trait]
pub trait CompletionProvider: PluginAdapter {
    /// Generates a reply for the given prompt and context.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, EchoverseError>;
}
