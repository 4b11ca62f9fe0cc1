// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage traits.

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::OnceCell;
use tracing::debug;

use nutria_config::model::StorageConfig;
use nutria_core::{
    ActiveReminder, AdapterType, ConversationTurn, HealthStatus, HistoryStore, MealRecord,
    MealSlot, MealStore, NewMeal, NutriaError, PluginAdapter, ProfileStore, ProfileUpdate,
    ReminderSetting, ReminderStore, Role, StorageAdapter, UserProfile,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// The database is opened by [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage. Nothing is opened until `initialize`.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, NutriaError> {
        self.db.get().ok_or_else(|| NutriaError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, NutriaError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT 1", [], |row| row.get(0))
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), NutriaError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), NutriaError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| NutriaError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), NutriaError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for SqliteStorage {
    async fn get_or_create_profile(&self, address: &str) -> Result<UserProfile, NutriaError> {
        queries::users::get_or_create(self.db()?, address).await
    }

    async fn get_profile(&self, address: &str) -> Result<Option<UserProfile>, NutriaError> {
        queries::users::get_by_address(self.db()?, address).await
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, NutriaError> {
        queries::users::update(self.db()?, user_id, update).await
    }
}

#[async_trait]
impl MealStore for SqliteStorage {
    async fn add_meal(&self, user_id: &str, meal: &NewMeal) -> Result<MealRecord, NutriaError> {
        queries::meals::add(self.db()?, user_id, meal).await
    }

    async fn meals_on(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<MealRecord>, NutriaError> {
        queries::meals::on_date(self.db()?, user_id, date).await
    }

    async fn meals_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MealRecord>, NutriaError> {
        queries::meals::between(self.db()?, user_id, start, end).await
    }
}

#[async_trait]
impl HistoryStore for SqliteStorage {
    async fn append_turn(
        &self,
        user_id: &str,
        role: Role,
        content: &str,
    ) -> Result<ConversationTurn, NutriaError> {
        queries::history::append(self.db()?, user_id, role, content).await
    }

    async fn recent_turns(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, NutriaError> {
        queries::history::recent(self.db()?, user_id, limit).await
    }

    async fn trim_history(&self, user_id: &str, keep_last: usize) -> Result<usize, NutriaError> {
        queries::history::trim(self.db()?, user_id, keep_last).await
    }
}

#[async_trait]
impl ReminderStore for SqliteStorage {
    async fn upsert_reminder(
        &self,
        user_id: &str,
        slot: MealSlot,
        time: &str,
    ) -> Result<ReminderSetting, NutriaError> {
        queries::reminders::upsert(self.db()?, user_id, slot, time).await
    }

    async fn reminders_for(&self, user_id: &str) -> Result<Vec<ReminderSetting>, NutriaError> {
        queries::reminders::for_user(self.db()?, user_id).await
    }

    async fn list_active_reminders(&self) -> Result<Vec<ActiveReminder>, NutriaError> {
        queries::reminders::list_active(self.db()?).await
    }
}
