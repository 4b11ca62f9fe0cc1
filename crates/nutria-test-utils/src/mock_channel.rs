// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound messages,
//! captured outbound messages, an in-memory media store and per-recipient
//! send failures.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use nutria_core::{
    AdapterType, ChannelAdapter, ChannelCapabilities, HealthStatus, InboundMessage, MediaRef,
    MessageContent, MessageId, NutriaError, OutboundMessage, PluginAdapter,
};

/// A mock messaging channel for testing.
///
/// Provides two queues:
/// - **inbound**: Messages injected via `inject_message()` are returned by `receive()`
/// - **sent**: Messages passed to `send()` are captured and retrievable via `sent_messages()`
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundMessage>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    media: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    notify: Arc<Notify>,
    closed: AtomicBool,
    next_id: AtomicUsize,
}

impl MockChannel {
    /// Create a new mock channel with empty queues.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            media: Arc::new(Mutex::new(HashMap::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
            notify: Arc::new(Notify::new()),
            closed: AtomicBool::new(false),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Inject an inbound message into the receive queue.
    pub async fn inject_message(&self, msg: InboundMessage) {
        self.inbound.lock().await.push_back(msg);
        self.notify.notify_one();
    }

    /// Makes `receive()` fail once the queue is drained.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Registers bytes returned by `fetch_media` for `id`.
    pub async fn add_media(&self, id: &str, bytes: Vec<u8>) {
        self.media.lock().await.insert(id.to_string(), bytes);
    }

    /// Every later `send()` to `address` fails.
    pub async fn fail_sends_to(&self, address: &str) {
        self.failing.lock().await.insert(address.to_string());
    }

    /// Get all messages that were sent through `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Texts sent to one recipient, in order.
    pub async fn sent_to(&self, address: &str) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.recipient == address)
            .map(|m| m.text.clone())
            .collect()
    }

    /// Get the count of sent messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Clear all sent messages.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, NutriaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), NutriaError> {
        self.close();
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_images: true,
            supports_audio: true,
            max_message_length: None,
        }
    }

    async fn connect(&mut self) -> Result<(), NutriaError> {
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, NutriaError> {
        if self.failing.lock().await.contains(&msg.recipient) {
            return Err(NutriaError::channel(format!(
                "mock delivery to {} failed",
                msg.recipient
            )));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().await.push(msg);
        Ok(MessageId(format!("mock-msg-{id}")))
    }

    async fn receive(&self) -> Result<InboundMessage, NutriaError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
                if self.closed.load(Ordering::SeqCst) {
                    return Err(NutriaError::channel("mock channel closed"));
                }
            }
            self.notify.notified().await;
        }
    }

    async fn fetch_media(&self, media: &MediaRef) -> Result<Vec<u8>, NutriaError> {
        self.media
            .lock()
            .await
            .get(&media.id)
            .cloned()
            .ok_or_else(|| NutriaError::Media {
                message: format!("unknown media id {}", media.id),
            })
    }
}

/// Builds an inbound text message from `sender`.
pub fn text_message(sender: &str, text: &str) -> InboundMessage {
    inbound(sender, MessageContent::Text(text.to_string()))
}

/// Builds an inbound image message referencing `media_id`.
pub fn image_message(sender: &str, media_id: &str, caption: Option<&str>) -> InboundMessage {
    inbound(
        sender,
        MessageContent::Image {
            media: MediaRef {
                id: media_id.to_string(),
                mime_type: "image/jpeg".to_string(),
            },
            caption: caption.map(str::to_string),
        },
    )
}

/// Builds an inbound voice note referencing `media_id`.
pub fn audio_message(sender: &str, media_id: &str) -> InboundMessage {
    inbound(
        sender,
        MessageContent::Audio {
            media: MediaRef {
                id: media_id.to_string(),
                mime_type: "audio/ogg".to_string(),
            },
        },
    )
}

pub fn inbound(sender: &str, content: MessageContent) -> InboundMessage {
    InboundMessage {
        id: format!("wamid.{sender}.{}", chrono::Utc::now().timestamp_micros()),
        sender: sender.to_string(),
        sender_name: None,
        content,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receive_returns_injected_messages() {
        let channel = MockChannel::new();
        channel.inject_message(text_message("5511", "oi")).await;

        let received = channel.receive().await.unwrap();
        assert_eq!(received.sender, "5511");
        assert_eq!(received.content, MessageContent::Text("oi".into()));
    }

    #[tokio::test]
    async fn send_captures_outbound_messages() {
        let channel = MockChannel::new();
        let id = channel
            .send(OutboundMessage::new("5511", "olá"))
            .await
            .unwrap();
        assert!(id.0.starts_with("mock-msg-"));

        let sent = channel.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "olá");
        assert_eq!(channel.sent_to("5511").await, vec!["olá".to_string()]);
    }

    #[tokio::test]
    async fn multiple_messages_in_order() {
        let channel = MockChannel::new();
        channel.inject_message(text_message("a", "first")).await;
        channel.inject_message(text_message("a", "second")).await;

        let first = channel.receive().await.unwrap();
        let second = channel.receive().await.unwrap();
        assert_eq!(first.content.text(), Some("first"));
        assert_eq!(second.content.text(), Some("second"));
    }

    #[tokio::test]
    async fn receive_waits_for_injection() {
        let channel = Arc::new(MockChannel::new());
        let injector = channel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
            injector.inject_message(text_message("a", "delayed")).await;
        });

        let received = tokio::time::timeout(tokio::time::Duration::from_secs(2), channel.receive())
            .await
            .expect("receive timed out")
            .unwrap();
        assert_eq!(received.content.text(), Some("delayed"));
    }

    #[tokio::test]
    async fn closed_channel_drains_then_fails() {
        let channel = MockChannel::new();
        channel.inject_message(text_message("a", "last")).await;
        channel.close();

        assert!(channel.receive().await.is_ok());
        assert!(matches!(
            channel.receive().await,
            Err(NutriaError::Channel { .. })
        ));
    }

    #[tokio::test]
    async fn failing_recipient_is_isolated() {
        let channel = MockChannel::new();
        channel.fail_sends_to("bad").await;

        assert!(channel.send(OutboundMessage::new("bad", "x")).await.is_err());
        assert!(channel.send(OutboundMessage::new("good", "y")).await.is_ok());
        assert_eq!(channel.sent_count().await, 1);

        channel.clear_sent().await;
        assert_eq!(channel.sent_count().await, 0);
    }

    #[tokio::test]
    async fn media_lookup() {
        let channel = MockChannel::new();
        channel.add_media("m1", vec![1, 2, 3]).await;

        let known = MediaRef {
            id: "m1".into(),
            mime_type: "image/jpeg".into(),
        };
        assert_eq!(channel.fetch_media(&known).await.unwrap(), vec![1, 2, 3]);

        let unknown = MediaRef {
            id: "m2".into(),
            mime_type: "image/jpeg".into(),
        };
        assert!(matches!(
            channel.fetch_media(&unknown).await,
            Err(NutriaError::Media { .. })
        ));
    }
}
