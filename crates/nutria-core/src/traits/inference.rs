// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inference adapter trait for the generative backend.

use async_trait::async_trait;

use crate::error::NutriaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ChatRequest;

/// Stateless request/response facade over a generative backend.
///
/// Implementations never retry; failures surface as
/// [`NutriaError::Inference`] and the caller decides what the user sees.
#[async_trait]
pub trait InferenceAdapter: PluginAdapter {
    /// Produces the assistant reply for a contextualized conversation.
    async fn chat(&self, request: ChatRequest) -> Result<String, NutriaError>;

    /// Describes the food in an image with estimated portions and calories.
    async fn analyze_image(&self, image: &[u8], mime_type: &str) -> Result<String, NutriaError>;

    /// Transcribes an audio clip to text.
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String, NutriaError>;
}
