// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock inference adapter for deterministic testing.
//!
//! `MockInference` implements `InferenceAdapter` with pre-configured chat,
//! image and transcription replies, so session tests run without any
//! external API calls.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use nutria_core::{
    AdapterType, ChatRequest, HealthStatus, InferenceAdapter, NutriaError, PluginAdapter,
};

/// Reply used when the chat queue is empty.
pub const DEFAULT_CHAT_REPLY: &str = "mock response";

#[derive(Default)]
struct Queues {
    chat: VecDeque<Result<String, String>>,
    image: VecDeque<Result<String, String>>,
    transcription: VecDeque<Result<String, String>>,
}

/// A mock inference provider that returns pre-configured replies.
///
/// Each operation pops from its own FIFO queue. An empty chat queue yields
/// [`DEFAULT_CHAT_REPLY`]; empty image and transcription queues fail.
pub struct MockInference {
    queues: Arc<Mutex<Queues>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockInference {
    /// Create a new mock with empty queues.
    pub fn new() -> Self {
        Self {
            queues: Arc::new(Mutex::new(Queues::default())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock pre-loaded with chat replies.
    pub fn with_chat_replies(replies: Vec<String>) -> Self {
        let queues = Queues {
            chat: replies.into_iter().map(Ok).collect(),
            ..Queues::default()
        };
        Self {
            queues: Arc::new(Mutex::new(queues)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn push_chat(&self, reply: &str) {
        self.queues.lock().await.chat.push_back(Ok(reply.to_string()));
    }

    pub async fn fail_next_chat(&self, message: &str) {
        self.queues
            .lock()
            .await
            .chat
            .push_back(Err(message.to_string()));
    }

    pub async fn push_image_analysis(&self, analysis: &str) {
        self.queues
            .lock()
            .await
            .image
            .push_back(Ok(analysis.to_string()));
    }

    pub async fn fail_next_image(&self, message: &str) {
        self.queues
            .lock()
            .await
            .image
            .push_back(Err(message.to_string()));
    }

    pub async fn push_transcription(&self, transcript: &str) {
        self.queues
            .lock()
            .await
            .transcription
            .push_back(Ok(transcript.to_string()));
    }

    /// Every chat request received, in order.
    pub async fn chat_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn last_chat_request(&self) -> Option<ChatRequest> {
        self.requests.lock().await.last().cloned()
    }
}

impl Default for MockInference {
    fn default() -> Self {
        Self::new()
    }
}

fn into_result(entry: Option<Result<String, String>>, what: &str) -> Result<String, NutriaError> {
    match entry {
        Some(Ok(text)) => Ok(text),
        Some(Err(message)) => Err(NutriaError::inference(message)),
        None => Err(NutriaError::inference(format!("no mock {what} queued"))),
    }
}

#[async_trait]
impl PluginAdapter for MockInference {
    fn name(&self) -> &str {
        "mock-inference"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Inference
    }

    async fn health_check(&self) -> Result<HealthStatus, NutriaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), NutriaError> {
        Ok(())
    }
}

#[async_trait]
impl InferenceAdapter for MockInference {
    async fn chat(&self, request: ChatRequest) -> Result<String, NutriaError> {
        self.requests.lock().await.push(request);
        match self.queues.lock().await.chat.pop_front() {
            Some(entry) => into_result(Some(entry), "chat reply"),
            None => Ok(DEFAULT_CHAT_REPLY.to_string()),
        }
    }

    async fn analyze_image(&self, _image: &[u8], _mime_type: &str) -> Result<String, NutriaError> {
        let entry = self.queues.lock().await.image.pop_front();
        into_result(entry, "image analysis")
    }

    async fn transcribe(&self, _audio: &[u8], _mime_type: &str) -> Result<String, NutriaError> {
        let entry = self.queues.lock().await.transcription.pop_front();
        into_result(entry, "transcription")
    }
}
