// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage wrapper that fails selected stores on demand.
//!
//! `FaultyStorage` delegates to a real [`SqliteStorage`] until a test calls
//! [`FaultyStorage::fail`]; from then on every operation of that store
//! returns [`NutriaError::Storage`] until [`FaultyStorage::heal`].

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use nutria_core::{
    ActiveReminder, AdapterType, ConversationTurn, HealthStatus, HistoryStore, MealRecord,
    MealSlot, MealStore, NewMeal, NutriaError, PluginAdapter, ProfileStore, ProfileUpdate,
    ReminderSetting, ReminderStore, Role, StorageAdapter, UserProfile,
};
use nutria_storage::SqliteStorage;

/// One of the four stores behind a [`StorageAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreFault {
    Profiles,
    Meals,
    History,
    Reminders,
}

pub struct FaultyStorage {
    inner: SqliteStorage,
    failing: Mutex<HashSet<StoreFault>>,
}

impl FaultyStorage {
    pub fn new(inner: SqliteStorage) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Makes every operation of `store` fail.
    pub fn fail(&self, store: StoreFault) {
        self.lock().insert(store);
    }

    pub fn heal(&self, store: StoreFault) {
        self.lock().remove(&store);
    }

    fn check(&self, store: StoreFault) -> Result<(), NutriaError> {
        if self.lock().contains(&store) {
            return Err(NutriaError::storage(std::io::Error::other(format!(
                "injected {store:?} failure"
            ))));
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<StoreFault>> {
        self.failing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PluginAdapter for FaultyStorage {
    fn name(&self) -> &str {
        "faulty-sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, NutriaError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), NutriaError> {
        PluginAdapter::shutdown(&self.inner).await
    }
}

#[async_trait]
impl StorageAdapter for FaultyStorage {
    async fn initialize(&self) -> Result<(), NutriaError> {
        self.inner.initialize().await
    }

    async fn close(&self) -> Result<(), NutriaError> {
        self.inner.close().await
    }
}

#[async_trait]
impl ProfileStore for FaultyStorage {
    async fn get_or_create_profile(&self, address: &str) -> Result<UserProfile, NutriaError> {
        self.check(StoreFault::Profiles)?;
        self.inner.get_or_create_profile(address).await
    }

    async fn get_profile(&self, address: &str) -> Result<Option<UserProfile>, NutriaError> {
        self.check(StoreFault::Profiles)?;
        self.inner.get_profile(address).await
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, NutriaError> {
        self.check(StoreFault::Profiles)?;
        self.inner.update_profile(user_id, update).await
    }
}

#[async_trait]
impl MealStore for FaultyStorage {
    async fn add_meal(&self, user_id: &str, meal: &NewMeal) -> Result<MealRecord, NutriaError> {
        self.check(StoreFault::Meals)?;
        self.inner.add_meal(user_id, meal).await
    }

    async fn meals_on(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<MealRecord>, NutriaError> {
        self.check(StoreFault::Meals)?;
        self.inner.meals_on(user_id, date).await
    }

    async fn meals_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MealRecord>, NutriaError> {
        self.check(StoreFault::Meals)?;
        self.inner.meals_between(user_id, start, end).await
    }
}

#[async_trait]
impl HistoryStore for FaultyStorage {
    async fn append_turn(
        &self,
        user_id: &str,
        role: Role,
        content: &str,
    ) -> Result<ConversationTurn, NutriaError> {
        self.check(StoreFault::History)?;
        self.inner.append_turn(user_id, role, content).await
    }

    async fn recent_turns(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, NutriaError> {
        self.check(StoreFault::History)?;
        self.inner.recent_turns(user_id, limit).await
    }

    async fn trim_history(&self, user_id: &str, keep_last: usize) -> Result<usize, NutriaError> {
        self.check(StoreFault::History)?;
        self.inner.trim_history(user_id, keep_last).await
    }
}

#[async_trait]
impl ReminderStore for FaultyStorage {
    async fn upsert_reminder(
        &self,
        user_id: &str,
        slot: MealSlot,
        time: &str,
    ) -> Result<ReminderSetting, NutriaError> {
        self.check(StoreFault::Reminders)?;
        self.inner.upsert_reminder(user_id, slot, time).await
    }

    async fn reminders_for(&self, user_id: &str) -> Result<Vec<ReminderSetting>, NutriaError> {
        self.check(StoreFault::Reminders)?;
        self.inner.reminders_for(user_id).await
    }

    async fn list_active_reminders(&self) -> Result<Vec<ActiveReminder>, NutriaError> {
        self.check(StoreFault::Reminders)?;
        self.inner.list_active_reminders().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutria_config::model::StorageConfig;

    #[tokio::test]
    async fn failing_store_recovers_after_heal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FaultyStorage::new(SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("faulty.db").to_string_lossy().into_owned(),
            wal_mode: true,
        }));
        storage.initialize().await.unwrap();

        storage.fail(StoreFault::Profiles);
        assert!(matches!(
            storage.get_or_create_profile("5511").await,
            Err(NutriaError::Storage { .. })
        ));
        assert!(storage.list_active_reminders().await.unwrap().is_empty());

        storage.heal(StoreFault::Profiles);
        assert!(storage.get_or_create_profile("5511").await.is_ok());
    }
}
