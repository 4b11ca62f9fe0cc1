// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `nutria summary` command implementation.

use chrono::NaiveDate;
use nutria_agent::session::render_period_report;
use nutria_config::model::NutriaConfig;
use nutria_core::{NutriaError, StorageAdapter};
use nutria_storage::SqliteStorage;

/// Prints the meals `address` recorded between `from` and `to`, inclusive.
pub async fn run_summary(
    config: &NutriaConfig,
    address: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(), NutriaError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let report = period_report(&storage, address, from, to).await;
    storage.close().await?;
    println!("{}", report?);
    Ok(())
}

async fn period_report<S: StorageAdapter + ?Sized>(
    storage: &S,
    address: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<String, NutriaError> {
    if from > to {
        return Err(NutriaError::InvalidInput(format!(
            "--from {from} is after --to {to}"
        )));
    }
    let Some(profile) = storage.get_profile(address).await? else {
        return Err(NutriaError::InvalidInput(format!(
            "no user with address {address}"
        )));
    };
    let meals = storage.meals_between(&profile.id, from, to).await?;
    Ok(render_period_report(from, to, &meals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use nutria_config::model::StorageConfig;
    use nutria_core::{MealSlot, MealStore, NewMeal, ProfileStore};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    async fn storage(dir: &tempfile::TempDir) -> SqliteStorage {
        let storage = SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("summary.db").to_string_lossy().into_owned(),
            wal_mode: true,
        });
        storage.initialize().await.unwrap();
        storage
    }

    #[tokio::test]
    async fn report_lists_meals_by_day() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir).await;
        let profile = storage.get_or_create_profile("5511").await.unwrap();
        for (d, hour, slot, food, kcal) in [
            (2, 8, MealSlot::Breakfast, "Tapioca", 250.0),
            (2, 13, MealSlot::Lunch, "Frango grelhado", 400.0),
            (3, 20, MealSlot::Dinner, "Sopa", 180.0),
            (9, 12, MealSlot::Lunch, "Fora do período", 999.0),
        ] {
            let meal = NewMeal {
                slot,
                food_name: food.into(),
                calories: kcal,
                date: day(d),
                time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
                from_image: false,
            };
            storage.add_meal(&profile.id, &meal).await.unwrap();
        }

        let report = period_report(&storage, "5511", day(1), day(7)).await.unwrap();
        assert!(report.starts_with("Refeições de 01/03/2026 a 07/03/2026:"));
        assert!(report.contains("02/03/2026:"));
        assert!(report.contains("- 13:00 Almoço: Frango grelhado (400 kcal)"));
        assert!(report.contains("Subtotal: 650 kcal"));
        assert!(!report.contains("Fora do período"));
        assert!(report.ends_with("Total: 830 kcal"));
    }

    #[tokio::test]
    async fn unknown_address_and_inverted_range_fail() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir).await;

        assert!(matches!(
            period_report(&storage, "nobody", day(1), day(2)).await,
            Err(NutriaError::InvalidInput(_))
        ));
        assert!(matches!(
            period_report(&storage, "nobody", day(2), day(1)).await,
            Err(NutriaError::InvalidInput(_))
        ));
    }
}
