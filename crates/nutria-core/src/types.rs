// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain and transport types shared across the Nutria workspace.

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of collaborator behind a [`crate::PluginAdapter`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Inference,
    Storage,
}

// --- Profile ---

/// Self-reported gender.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

/// Nutritional goal the user is working towards.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    GainMuscle,
    LoseWeight,
    MaintainWeight,
    #[default]
    Unknown,
}

impl Goal {
    /// Portuguese description used in the model context block.
    pub fn description(&self) -> &'static str {
        match self {
            Goal::GainMuscle => "ganhar massa muscular",
            Goal::LoseWeight => "emagrecer",
            Goal::MaintainWeight => "manter o peso",
            Goal::Unknown => "não informado",
        }
    }
}

/// A user's durable profile, one per transport address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Opaque identifier generated on first contact.
    pub id: String,
    /// External contact identifier (phone number for WhatsApp).
    pub address: String,
    pub name: Option<String>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub age: Option<u32>,
    pub gender: Gender,
    pub goal: Goal,
    pub created_at: String,
    pub updated_at: String,
}

/// A partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub goal: Option<Goal>,
}

impl ProfileUpdate {
    /// Returns true when no field is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.weight_kg.is_none()
            && self.height_cm.is_none()
            && self.age.is_none()
            && self.gender.is_none()
            && self.goal.is_none()
    }
}

// --- Meals ---

/// One of the four daily meal slots.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Snack,
    Dinner,
}

impl MealSlot {
    /// All slots in the order they happen during a day.
    pub const ALL: [MealSlot; 4] = [
        MealSlot::Breakfast,
        MealSlot::Lunch,
        MealSlot::Snack,
        MealSlot::Dinner,
    ];

    /// Derives the slot from a local hour of day.
    ///
    /// Half-open windows: [5, 11) breakfast, [11, 15) lunch, [15, 19) snack,
    /// everything else dinner.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=10 => MealSlot::Breakfast,
            11..=14 => MealSlot::Lunch,
            15..=18 => MealSlot::Snack,
            _ => MealSlot::Dinner,
        }
    }

    /// Derives the slot from a local time of day.
    pub fn from_time(time: NaiveTime) -> Self {
        Self::from_hour(time.hour())
    }

    /// User-facing Portuguese label.
    pub fn label(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "Café da manhã",
            MealSlot::Lunch => "Almoço",
            MealSlot::Snack => "Lanche",
            MealSlot::Dinner => "Jantar",
        }
    }

    /// Parses a Portuguese or English slot name typed by a user.
    pub fn parse_user_input(input: &str) -> Option<Self> {
        let lower = input.trim().to_lowercase();
        match lower.as_str() {
            "cafe" | "café" | "cafe da manha" | "café da manhã" | "breakfast" => {
                Some(MealSlot::Breakfast)
            }
            "almoco" | "almoço" | "lunch" => Some(MealSlot::Lunch),
            "lanche" | "snack" => Some(MealSlot::Snack),
            "jantar" | "janta" | "dinner" => Some(MealSlot::Dinner),
            _ => None,
        }
    }
}

/// A meal about to be recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMeal {
    pub slot: MealSlot,
    pub food_name: String,
    pub calories: f64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub from_image: bool,
}

/// A persisted meal. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    pub id: i64,
    pub user_id: String,
    pub slot: MealSlot,
    pub food_name: String,
    pub calories: f64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub from_image: bool,
    pub created_at: String,
}

// --- Conversation ---

/// Author of a conversation turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A stored conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: i64,
    pub user_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

// --- Reminders ---

/// A user's reminder for one meal slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderSetting {
    pub id: i64,
    pub user_id: String,
    pub slot: MealSlot,
    /// Time of day as `HH:MM`.
    pub time: String,
    pub enabled: bool,
    pub created_at: String,
}

/// An enabled reminder joined with the owning profile's address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveReminder {
    pub user_id: String,
    pub address: String,
    pub name: Option<String>,
    pub slot: MealSlot,
    pub time: String,
}

// --- Channel types ---

/// Reference to a media object held by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: String,
    pub mime_type: String,
}

/// Normalized content of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageContent {
    /// Plain text.
    Text(String),
    /// An image, optionally captioned.
    Image {
        media: MediaRef,
        caption: Option<String>,
    },
    /// An audio clip or voice note.
    Audio { media: MediaRef },
    /// Anything the assistant cannot handle (documents, stickers, locations).
    Unsupported { kind: String },
}

impl MessageContent {
    /// Text the user typed, if any. Images yield their caption.
    pub fn text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(t) => Some(t),
            MessageContent::Image { caption, .. } => caption.as_deref(),
            _ => None,
        }
    }
}

/// An inbound message received from a channel adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Transport-assigned message id.
    pub id: String,
    /// Sender address.
    pub sender: String,
    /// Display name reported by the transport, if any.
    pub sender_name: Option<String>,
    pub content: MessageContent,
    /// RFC 3339 receive time.
    pub timestamp: String,
}

/// An outbound text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub recipient: String,
    pub text: String,
}

impl OutboundMessage {
    pub fn new(recipient: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            text: text.into(),
        }
    }
}

/// Capabilities reported by a channel adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCapabilities {
    pub supports_images: bool,
    pub supports_audio: bool,
    pub max_message_length: Option<usize>,
}

// --- Inference types ---

/// One turn passed to the chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// A chat completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// System instruction followed by the user context block.
    pub system_prompt: String,
    /// Conversation turns in chronological order.
    pub turns: Vec<ChatTurn>,
}
