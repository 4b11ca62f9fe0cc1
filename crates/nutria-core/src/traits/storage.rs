// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits for profiles, meals, conversation history and reminders.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::NutriaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    ActiveReminder, ConversationTurn, MealRecord, MealSlot, NewMeal, ProfileUpdate,
    ReminderSetting, Role, UserProfile,
};

/// Profile persistence, one profile per address.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns the profile for `address`, creating an empty one on first contact.
    async fn get_or_create_profile(&self, address: &str) -> Result<UserProfile, NutriaError>;

    /// Returns the profile for `address` without creating it.
    async fn get_profile(&self, address: &str) -> Result<Option<UserProfile>, NutriaError>;

    /// Merges the set fields of `update` and bumps `updated_at`.
    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, NutriaError>;
}

/// Append-only meal log.
#[async_trait]
pub trait MealStore: Send + Sync {
    async fn add_meal(&self, user_id: &str, meal: &NewMeal) -> Result<MealRecord, NutriaError>;

    /// Meals on one date, ordered by time ascending.
    async fn meals_on(&self, user_id: &str, date: NaiveDate)
    -> Result<Vec<MealRecord>, NutriaError>;

    /// Meals in the inclusive date range, ordered by date then time.
    async fn meals_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MealRecord>, NutriaError>;
}

/// Append-only conversation log with retention trimming.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append_turn(
        &self,
        user_id: &str,
        role: Role,
        content: &str,
    ) -> Result<ConversationTurn, NutriaError>;

    /// The most recent `limit` turns, oldest first.
    async fn recent_turns(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, NutriaError>;

    /// Deletes everything older than the newest `keep_last` turns.
    /// Returns the number of turns removed.
    async fn trim_history(&self, user_id: &str, keep_last: usize) -> Result<usize, NutriaError>;
}

/// Reminder settings, unique per (user, slot).
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Inserts or updates the reminder for `(user_id, slot)` and re-enables it.
    async fn upsert_reminder(
        &self,
        user_id: &str,
        slot: MealSlot,
        time: &str,
    ) -> Result<ReminderSetting, NutriaError>;

    async fn reminders_for(&self, user_id: &str) -> Result<Vec<ReminderSetting>, NutriaError>;

    /// Every enabled reminder joined with the owner's address.
    async fn list_active_reminders(&self) -> Result<Vec<ActiveReminder>, NutriaError>;
}

/// A complete storage backend.
///
/// Storage adapters manage the lifecycle of database connections and expose
/// every store the assistant needs.
#[async_trait]
pub trait StorageAdapter:
    PluginAdapter + ProfileStore + MealStore + HistoryStore + ReminderStore
{
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), NutriaError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), NutriaError>;
}
