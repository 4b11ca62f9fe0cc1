// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloud API webhook payloads and their normalization into [`InboundMessage`]s.

use nutria_core::{InboundMessage, MediaRef, MessageContent};
use serde::Deserialize;

/// Top-level webhook notification.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
pub struct Change {
    pub value: ChangeValue,
}

/// Messages and contacts carried by one change. Status callbacks carry
/// `statuses` instead and are ignored.
#[derive(Debug, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<WaMessage>,
}

#[derive(Debug, Deserialize)]
pub struct Contact {
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<ContactProfile>,
}

#[derive(Debug, Deserialize)]
pub struct ContactProfile {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct WaMessage {
    pub from: String,
    pub id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<WaText>,
    #[serde(default)]
    pub image: Option<WaMedia>,
    #[serde(default)]
    pub audio: Option<WaMedia>,
    #[serde(default)]
    pub voice: Option<WaMedia>,
}

#[derive(Debug, Deserialize)]
pub struct WaText {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct WaMedia {
    pub id: String,
    pub mime_type: String,
    #[serde(default)]
    pub caption: Option<String>,
}

impl WaMedia {
    fn media_ref(&self) -> MediaRef {
        MediaRef {
            id: self.id.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// Flattens a webhook notification into normalized inbound messages.
pub fn normalize(payload: WebhookPayload) -> Vec<InboundMessage> {
    let mut out = Vec::new();
    for change in payload.entry.into_iter().flat_map(|e| e.changes) {
        let value = change.value;
        for msg in value.messages {
            let sender_name = value
                .contacts
                .iter()
                .find(|c| c.wa_id == msg.from)
                .and_then(|c| c.profile.as_ref())
                .map(|p| p.name.clone());
            out.push(InboundMessage {
                content: content_of(&msg),
                timestamp: timestamp_of(msg.timestamp.as_deref()),
                id: msg.id,
                sender: msg.from,
                sender_name,
            });
        }
    }
    out
}

fn content_of(msg: &WaMessage) -> MessageContent {
    match msg.kind.as_str() {
        "text" => MessageContent::Text(
            msg.text.as_ref().map(|t| t.body.clone()).unwrap_or_default(),
        ),
        "image" => match &msg.image {
            Some(image) => MessageContent::Image {
                media: image.media_ref(),
                caption: image.caption.clone().filter(|c| !c.trim().is_empty()),
            },
            None => unsupported(msg),
        },
        "audio" | "voice" => match msg.audio.as_ref().or(msg.voice.as_ref()) {
            Some(audio) => MessageContent::Audio {
                media: audio.media_ref(),
            },
            None => unsupported(msg),
        },
        _ => unsupported(msg),
    }
}

fn unsupported(msg: &WaMessage) -> MessageContent {
    MessageContent::Unsupported {
        kind: msg.kind.clone(),
    }
}

/// Cloud API timestamps are unix seconds as strings.
fn timestamp_of(raw: Option<&str>) -> String {
    raw.and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(chrono::Utc::now)
        .to_rfc3339()
}
