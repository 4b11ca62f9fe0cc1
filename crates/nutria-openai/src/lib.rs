// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible inference adapter for Nutria.
//!
//! Implements [`InferenceAdapter`] over Chat Completions (conversation and
//! food photo analysis) and Audio Transcriptions.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use nutria_config::model::OpenAiConfig;
use nutria_core::{
    AdapterType, ChatRequest, HealthStatus, InferenceAdapter, NutriaError, PluginAdapter, Role,
};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{ApiContent, ApiMessage, ChatCompletionRequest, ContentPart, ImageUrl};

/// System instruction for food photo analysis.
const VISION_SYSTEM_PROMPT: &str = "Você é um especialista em nutrição que identifica alimentos em imagens e estima suas calorias. Responda SEMPRE em português do Brasil de forma clara e objetiva.";

/// User instruction sent alongside the photo. The response format is what
/// the calorie and food-name parsers expect.
const VISION_USER_PROMPT: &str = "Analise esta imagem e identifique os alimentos presentes. Para cada alimento, estime a quantidade em gramas e as calorias totais. Se não conseguir identificar comida na imagem, diga isso claramente. Formato da resposta: [Nome do alimento] - [quantidade estimada] - [calorias estimadas]";

/// Inference backend speaking the OpenAI HTTP API.
///
/// API key resolution order: config -> `OPENAI_API_KEY` env var -> error.
pub struct OpenAiInference {
    client: OpenAiClient,
    config: OpenAiConfig,
}

impl OpenAiInference {
    pub fn new(config: &OpenAiConfig) -> Result<Self, NutriaError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = OpenAiClient::new(
            &api_key,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(
            chat_model = config.chat_model,
            vision_model = config.vision_model,
            "OpenAI inference initialized"
        );
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn first_choice(
        response: types::ChatCompletionResponse,
    ) -> Result<String, NutriaError> {
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| NutriaError::inference("response contained no message content"))
    }
}

#[async_trait]
impl PluginAdapter for OpenAiInference {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Inference
    }

    async fn health_check(&self) -> Result<HealthStatus, NutriaError> {
        // Probing the API would spend tokens; a built client is healthy.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), NutriaError> {
        Ok(())
    }
}

#[async_trait]
impl InferenceAdapter for OpenAiInference {
    async fn chat(&self, request: ChatRequest) -> Result<String, NutriaError> {
        let mut messages = Vec::with_capacity(request.turns.len() + 1);
        messages.push(ApiMessage::text("system", request.system_prompt));
        messages.extend(request.turns.into_iter().map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            ApiMessage::text(role, turn.content)
        }));

        let body = ChatCompletionRequest {
            model: self.config.chat_model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
        };
        debug!(turns = body.messages.len() - 1, "sending chat request");
        Self::first_choice(self.client.chat_completion(&body).await?)
    }

    async fn analyze_image(&self, image: &[u8], mime_type: &str) -> Result<String, NutriaError> {
        let data_url = format!("data:{mime_type};base64,{}", STANDARD.encode(image));
        let body = ChatCompletionRequest {
            model: self.config.vision_model.clone(),
            messages: vec![
                ApiMessage::text("system", VISION_SYSTEM_PROMPT),
                ApiMessage {
                    role: "user".into(),
                    content: ApiContent::Parts(vec![
                        ContentPart::Text {
                            text: VISION_USER_PROMPT.into(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl { url: data_url },
                        },
                    ]),
                },
            ],
            max_tokens: self.config.vision_max_tokens,
            temperature: None,
        };
        debug!(bytes = image.len(), mime_type, "sending image analysis request");
        Self::first_choice(self.client.chat_completion(&body).await?)
    }

    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String, NutriaError> {
        debug!(bytes = audio.len(), mime_type, "sending transcription request");
        let response = self
            .client
            .transcription(
                audio,
                mime_type,
                &self.config.transcription_model,
                &self.config.language,
            )
            .await?;
        let text = response.text.trim().to_string();
        if text.is_empty() {
            return Err(NutriaError::inference("transcription was empty"));
        }
        Ok(text)
    }
}

fn resolve_api_key(config_key: &Option<String>) -> Result<String, NutriaError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("OPENAI_API_KEY").map_err(|_| {
        NutriaError::Config(
            "OpenAI API key not found. Set openai.api_key in config or OPENAI_API_KEY environment variable.".into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutria_core::ChatTurn;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> OpenAiInference {
        let config = OpenAiConfig {
            api_key: Some("sk-test".into()),
            base_url: server.uri(),
            ..Default::default()
        };
        OpenAiInference::new(&config).unwrap()
    }

    fn completion(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}]
        })
    }

    #[tokio::test]
    async fn chat_sends_system_prompt_and_turns() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_string_contains("Contexto do usuário"))
            .and(body_string_contains("\"model\":\"gpt-4o\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Olá, Ana!")))
            .expect(1)
            .mount(&server)
            .await;

        let reply = adapter(&server)
            .chat(ChatRequest {
                system_prompt: "Você é Nutri.ia\n\nContexto do usuário:\n".into(),
                turns: vec![ChatTurn {
                    role: Role::User,
                    content: "oi".into(),
                }],
            })
            .await
            .unwrap();
        assert_eq!(reply, "Olá, Ana!");
    }

    #[tokio::test]
    async fn image_is_sent_as_data_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("data:image/jpeg;base64,AQID"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("Arroz com feijão - 300g - 450 kcal")),
            )
            .mount(&server)
            .await;

        let text = adapter(&server)
            .analyze_image(&[1, 2, 3], "image/jpeg")
            .await
            .unwrap();
        assert!(text.contains("450 kcal"));
    }

    #[tokio::test]
    async fn transcription_posts_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .and(body_string_contains("whisper-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": " comi uma maçã "})),
            )
            .mount(&server)
            .await;

        let text = adapter(&server)
            .transcribe(b"OggS", "audio/ogg; codecs=opus")
            .await
            .unwrap();
        assert_eq!(text, "comi uma maçã");
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "Rate limit reached", "type": "rate_limit_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = adapter(&server)
            .chat(ChatRequest {
                system_prompt: "s".into(),
                turns: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, NutriaError::Inference { .. }));
        assert!(err.to_string().contains("rate_limit_error"), "got: {err}");
    }

    #[tokio::test]
    async fn empty_choice_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let result = adapter(&server)
            .chat(ChatRequest {
                system_prompt: "s".into(),
                turns: vec![],
            })
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn resolve_api_key_from_config() {
        assert_eq!(resolve_api_key(&Some("sk-1".into())).unwrap(), "sk-1");
    }
}
