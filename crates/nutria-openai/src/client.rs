// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible endpoints.
//!
//! There is no retry loop: a failed call surfaces immediately and the
//! session layer turns it into an apology.

use std::time::Duration;

use nutria_core::NutriaError;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{
    ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse, TranscriptionResponse,
};

/// HTTP client holding the bearer token and base URL.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    /// Builds a client for `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, NutriaError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| NutriaError::Config(format!("invalid API key header value: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| NutriaError::Inference {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends a chat completion and returns the parsed response.
    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, NutriaError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(request_failed)?;
        debug!(status = %response.status(), model = %request.model, "chat completion response");
        parse_json(response).await
    }

    /// Uploads an audio clip for transcription.
    pub async fn transcription(
        &self,
        audio: &[u8],
        mime_type: &str,
        model: &str,
        language: &str,
    ) -> Result<TranscriptionResponse, NutriaError> {
        let url = format!("{}/audio/transcriptions", self.base_url);
        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name(format!("audio.{}", audio_extension(mime_type)))
            .mime_str(base_mime(mime_type))
            .map_err(request_failed)?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", model.to_string())
            .text("language", language.to_string())
            .text("response_format", "json");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(request_failed)?;
        debug!(status = %response.status(), model, "transcription response");
        parse_json(response).await
    }
}

fn request_failed(e: reqwest::Error) -> NutriaError {
    NutriaError::Inference {
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, NutriaError> {
    let status = response.status();
    let body = response.text().await.map_err(|e| NutriaError::Inference {
        message: format!("failed to read response body: {e}"),
        source: Some(Box::new(e)),
    })?;

    if !status.is_success() {
        let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
            Ok(api_err) => format!(
                "API error ({}): {}",
                api_err.error.type_.as_deref().unwrap_or("unknown"),
                api_err.error.message
            ),
            Err(_) => format!("API returned {status}: {body}"),
        };
        return Err(NutriaError::inference(message));
    }

    serde_json::from_str(&body).map_err(|e| NutriaError::Inference {
        message: format!("failed to parse API response: {e}"),
        source: Some(Box::new(e)),
    })
}

/// `audio/ogg; codecs=opus` -> `audio/ogg`.
fn base_mime(mime_type: &str) -> &str {
    mime_type.split(';').next().unwrap_or(mime_type).trim()
}

/// File extension the transcription endpoint uses to detect the format.
fn audio_extension(mime_type: &str) -> &'static str {
    match base_mime(mime_type) {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/webm" => "webm",
        "audio/aac" => "aac",
        _ => "ogg",
    }
}
