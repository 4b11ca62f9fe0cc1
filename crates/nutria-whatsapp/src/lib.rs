// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API channel adapter for Nutria.
//!
//! Implements [`ChannelAdapter`]: an axum webhook server feeds a bounded
//! inbound queue, and replies go out through the Graph API.

pub mod api;
pub mod payload;
pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use nutria_config::model::WhatsAppConfig;
use nutria_core::{
    AdapterType, ChannelAdapter, ChannelCapabilities, HealthStatus, InboundMessage, MediaRef,
    MessageId, NutriaError, OutboundMessage, PluginAdapter,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::api::GraphClient;
use crate::webhook::WebhookState;

/// Graph API text body limit.
const MAX_TEXT_LENGTH: usize = 4096;

/// WhatsApp channel adapter implementing [`ChannelAdapter`].
pub struct WhatsAppChannel {
    client: GraphClient,
    config: WhatsAppConfig,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WhatsAppChannel {
    /// Creates a new adapter. Requires `access_token` and `phone_number_id`.
    pub fn new(config: WhatsAppConfig) -> Result<Self, NutriaError> {
        let token = required(config.access_token.as_deref(), "whatsapp.access_token")?;
        let phone_id = required(config.phone_number_id.as_deref(), "whatsapp.phone_number_id")?;
        let client = GraphClient::new(&config.api_base_url, token, phone_id)?;
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            client,
            config,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            server_handle: None,
            cancel: CancellationToken::new(),
        })
    }

    fn webhook_state(&self) -> WebhookState {
        WebhookState {
            inbound_tx: self.inbound_tx.clone(),
            verify_token: self.config.verify_token.clone(),
            app_secret: self.config.app_secret.as_deref().map(Arc::from),
        }
    }
}

fn required<'a>(value: Option<&'a str>, key: &str) -> Result<&'a str, NutriaError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(NutriaError::Config(format!(
            "{key} is required for the WhatsApp adapter"
        ))),
    }
}

/// Cuts `text` to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl PluginAdapter for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, NutriaError> {
        match &self.server_handle {
            Some(handle) if handle.is_finished() => Ok(HealthStatus::Unhealthy(
                "webhook server stopped".into(),
            )),
            Some(_) => Ok(HealthStatus::Healthy),
            None => Ok(HealthStatus::Degraded("not connected".into())),
        }
    }

    async fn shutdown(&self) -> Result<(), NutriaError> {
        self.cancel.cancel();
        info!("whatsapp channel shutting down");
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for WhatsAppChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_images: true,
            supports_audio: true,
            max_message_length: Some(MAX_TEXT_LENGTH),
        }
    }

    async fn connect(&mut self) -> Result<(), NutriaError> {
        let addr = format!("{}:{}", self.config.bind_address, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| NutriaError::Channel {
                message: format!("failed to bind webhook to {addr}: {e}"),
                source: Some(Box::new(e)),
            })?;

        let state = self.webhook_state();
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = webhook::serve(listener, state, cancel).await {
                error!(error = %e, "whatsapp webhook server exited");
            }
        });
        self.server_handle = Some(handle);
        info!(addr = %addr, "whatsapp channel connected");
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, NutriaError> {
        let text = truncate_chars(&msg.text, MAX_TEXT_LENGTH);
        let id = self.client.send_text(&msg.recipient, text).await?;
        debug!(to = %msg.recipient, id = %id, "whatsapp message sent");
        Ok(MessageId(id))
    }

    async fn receive(&self) -> Result<InboundMessage, NutriaError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| NutriaError::channel("whatsapp inbound channel closed"))
    }

    async fn fetch_media(&self, media: &MediaRef) -> Result<Vec<u8>, NutriaError> {
        let bytes = self.client.download_media(&media.id).await.map_err(|e| {
            NutriaError::Media {
                message: format!("failed to fetch media {}: {e}", media.id),
            }
        })?;
        debug!(id = %media.id, size = bytes.len(), "media downloaded");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: &str) -> WhatsAppConfig {
        WhatsAppConfig {
            access_token: Some("token".into()),
            phone_number_id: Some("1234".into()),
            api_base_url: base.to_string(),
            port: 0,
            ..WhatsAppConfig::default()
        }
    }

    #[test]
    fn new_requires_credentials() {
        let err = WhatsAppChannel::new(WhatsAppConfig::default()).err().unwrap();
        assert!(err.to_string().contains("whatsapp.access_token"));

        let cfg = WhatsAppConfig {
            access_token: Some("t".into()),
            ..WhatsAppConfig::default()
        };
        let err = WhatsAppChannel::new(cfg).err().unwrap();
        assert!(err.to_string().contains("phone_number_id"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("olá mundo", 3), "olá");
        assert_eq!(truncate_chars("ok", 10), "ok");
    }

    #[tokio::test]
    async fn send_posts_to_graph_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1234/messages"))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "messages": [{"id": "wamid.out"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let channel = WhatsAppChannel::new(config(&server.uri())).unwrap();
        let id = channel
            .send(OutboundMessage::new("5511999990000", "Olá!"))
            .await
            .unwrap();
        assert_eq!(id, MessageId("wamid.out".into()));
    }

    #[tokio::test]
    async fn send_failure_is_channel_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let channel = WhatsAppChannel::new(config(&server.uri())).unwrap();
        let err = channel
            .send(OutboundMessage::new("5511", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, NutriaError::Channel { .. }));
    }

    #[tokio::test]
    async fn fetch_media_resolves_then_downloads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "url": format!("{}/files/media-1", server.uri()),
                "mime_type": "image/jpeg"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/media-1"))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .mount(&server)
            .await;

        let channel = WhatsAppChannel::new(config(&server.uri())).unwrap();
        let bytes = channel
            .fetch_media(&MediaRef {
                id: "media-1".into(),
                mime_type: "image/jpeg".into(),
            })
            .await
            .unwrap();
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn fetch_media_failure_is_media_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let channel = WhatsAppChannel::new(config(&server.uri())).unwrap();
        let err = channel
            .fetch_media(&MediaRef {
                id: "gone".into(),
                mime_type: "audio/ogg".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, NutriaError::Media { .. }));
    }

    #[tokio::test]
    async fn connected_channel_receives_webhook_messages() {
        let mut channel = WhatsAppChannel::new(config("http://127.0.0.1:9")).unwrap();
        channel.connect().await.unwrap();
        assert_eq!(channel.health_check().await.unwrap(), HealthStatus::Healthy);

        channel
            .inbound_tx
            .send(InboundMessage {
                id: "wamid.9".into(),
                sender: "5511".into(),
                sender_name: None,
                content: nutria_core::MessageContent::Text("sim".into()),
                timestamp: "2026-01-01T00:00:00Z".into(),
            })
            .await
            .unwrap();
        let msg = channel.receive().await.unwrap();
        assert_eq!(msg.id, "wamid.9");
        channel.shutdown().await.unwrap();
    }
}
