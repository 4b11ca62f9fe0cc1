// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Nutria nutrition assistant.
//!
//! This crate provides the error type, domain types, and the collaborator
//! traits the session manager and reminder dispatcher are written against.
//! Transport, inference and storage crates implement the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

pub use error::NutriaError;
pub use types::{
    ActiveReminder, AdapterType, ChannelCapabilities, ChatRequest, ChatTurn, ConversationTurn,
    Gender, Goal, HealthStatus, InboundMessage, MealRecord, MealSlot, MediaRef, MessageContent,
    MessageId, NewMeal, OutboundMessage, ProfileUpdate, ReminderSetting, Role, UserProfile,
};

pub use traits::{
    ChannelAdapter, Clock, HistoryStore, InferenceAdapter, MealStore, PluginAdapter, ProfileStore,
    ReminderStore, StorageAdapter, SystemClock,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn nutria_error_has_all_variants() {
        let _config = NutriaError::Config("test".into());
        let _storage = NutriaError::storage(std::io::Error::other("test"));
        let _channel = NutriaError::channel("test");
        let _inference = NutriaError::inference("test");
        let _media = NutriaError::Media {
            message: "test".into(),
        };
        let _invalid = NutriaError::InvalidInput("test".into());
        let _timeout = NutriaError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = NutriaError::Internal("test".into());
    }

    #[test]
    fn meal_slot_from_hour_boundaries() {
        assert_eq!(MealSlot::from_hour(7), MealSlot::Breakfast);
        assert_eq!(MealSlot::from_hour(5), MealSlot::Breakfast);
        assert_eq!(MealSlot::from_hour(11), MealSlot::Lunch);
        assert_eq!(MealSlot::from_hour(15), MealSlot::Snack);
        assert_eq!(MealSlot::from_hour(18), MealSlot::Snack);
        assert_eq!(MealSlot::from_hour(19), MealSlot::Dinner);
        assert_eq!(MealSlot::from_hour(20), MealSlot::Dinner);
        assert_eq!(MealSlot::from_hour(4), MealSlot::Dinner);
        assert_eq!(MealSlot::from_hour(0), MealSlot::Dinner);
    }

    #[test]
    fn enums_round_trip_through_snake_case() {
        for slot in MealSlot::ALL {
            assert_eq!(MealSlot::from_str(&slot.to_string()).unwrap(), slot);
        }
        assert_eq!(Goal::GainMuscle.to_string(), "gain_muscle");
        assert_eq!(Goal::from_str("lose_weight").unwrap(), Goal::LoseWeight);
        assert_eq!(Gender::from_str("female").unwrap(), Gender::Female);
        assert_eq!(Role::Assistant.to_string(), "assistant");

        let json = serde_json::to_string(&MealSlot::Snack).unwrap();
        assert_eq!(json, "\"snack\"");
    }

    #[test]
    fn parse_user_slot_names() {
        assert_eq!(
            MealSlot::parse_user_input("Café da manhã"),
            Some(MealSlot::Breakfast)
        );
        assert_eq!(MealSlot::parse_user_input("ALMOÇO"), Some(MealSlot::Lunch));
        assert_eq!(MealSlot::parse_user_input("janta"), Some(MealSlot::Dinner));
        assert_eq!(MealSlot::parse_user_input("ceia"), None);
    }

    #[test]
    fn empty_profile_update() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate {
            age: Some(30),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn image_caption_counts_as_text() {
        let content = MessageContent::Image {
            media: MediaRef {
                id: "m1".into(),
                mime_type: "image/jpeg".into(),
            },
            caption: Some("almoço".into()),
        };
        assert_eq!(content.text(), Some("almoço"));
        let audio = MessageContent::Audio {
            media: MediaRef {
                id: "m2".into(),
                mime_type: "audio/ogg".into(),
            },
        };
        assert_eq!(audio.text(), None);
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_channel_adapter<T: ChannelAdapter>() {}
        fn _assert_inference_adapter<T: InferenceAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_clock<T: Clock>() {}
        _assert_clock::<SystemClock>();
    }
}
