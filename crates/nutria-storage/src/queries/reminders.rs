// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reminder setting queries.

use nutria_core::{ActiveReminder, MealSlot, NutriaError, ReminderSetting};
use rusqlite::params;

use crate::database::{Database, map_tr_err, now_timestamp};
use crate::queries::enum_column;

fn row_to_setting(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReminderSetting> {
    Ok(ReminderSetting {
        id: row.get(0)?,
        user_id: row.get(1)?,
        slot: enum_column(row, 2)?,
        time: row.get(3)?,
        enabled: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Inserts or replaces the reminder for `(user_id, slot)`, re-enabling it.
pub async fn upsert(
    db: &Database,
    user_id: &str,
    slot: MealSlot,
    time: &str,
) -> Result<ReminderSetting, NutriaError> {
    let user_id = user_id.to_string();
    let time = time.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<ReminderSetting, rusqlite::Error> {
            conn.execute(
                "INSERT INTO reminder_settings (user_id, meal_type, reminder_time, enabled, created_at)
                 VALUES (?1, ?2, ?3, 1, ?4)
                 ON CONFLICT(user_id, meal_type)
                 DO UPDATE SET reminder_time = excluded.reminder_time, enabled = 1",
                params![user_id, slot.to_string(), time, now],
            )?;
            conn.query_row(
                "SELECT id, user_id, meal_type, reminder_time, enabled, created_at
                 FROM reminder_settings WHERE user_id = ?1 AND meal_type = ?2",
                params![user_id, slot.to_string()],
                row_to_setting,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// All reminders of one user, ordered by time of day.
pub async fn for_user(db: &Database, user_id: &str) -> Result<Vec<ReminderSetting>, NutriaError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<ReminderSetting>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, meal_type, reminder_time, enabled, created_at
                 FROM reminder_settings WHERE user_id = ?1 ORDER BY reminder_time ASC",
            )?;
            let rows = stmt.query_map(params![user_id], row_to_setting)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Every enabled reminder joined with its owner's address.
pub async fn list_active(db: &Database) -> Result<Vec<ActiveReminder>, NutriaError> {
    db.connection()
        .call(|conn| -> Result<Vec<ActiveReminder>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT r.user_id, u.address, u.name, r.meal_type, r.reminder_time
                 FROM reminder_settings r JOIN users u ON u.id = r.user_id
                 WHERE r.enabled = 1
                 ORDER BY r.reminder_time ASC, u.address ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(ActiveReminder {
                    user_id: row.get(0)?,
                    address: row.get(1)?,
                    name: row.get(2)?,
                    slot: enum_column(row, 3)?,
                    time: row.get(4)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::open_temp_db;
    use crate::queries::users;

    #[tokio::test]
    async fn upsert_is_unique_per_user_and_slot() {
        let (db, _dir) = open_temp_db().await;
        let user = users::get_or_create(&db, "5511").await.unwrap();

        let first = upsert(&db, &user.id, MealSlot::Breakfast, "07:30").await.unwrap();
        let second = upsert(&db, &user.id, MealSlot::Breakfast, "08:00").await.unwrap();
        upsert(&db, &user.id, MealSlot::Dinner, "19:30").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.time, "08:00");
        assert!(second.enabled);

        let all = for_user(&db, &user.id).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].slot, MealSlot::Breakfast);
        assert_eq!(all[1].slot, MealSlot::Dinner);
    }

    #[tokio::test]
    async fn upsert_re_enables_disabled_reminder() {
        let (db, _dir) = open_temp_db().await;
        let user = users::get_or_create(&db, "5511").await.unwrap();
        upsert(&db, &user.id, MealSlot::Lunch, "12:00").await.unwrap();

        let user_id = user.id.clone();
        db.connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "UPDATE reminder_settings SET enabled = 0 WHERE user_id = ?1",
                    params![user_id],
                )
            })
            .await
            .unwrap();
        assert!(list_active(&db).await.unwrap().is_empty());

        upsert(&db, &user.id, MealSlot::Lunch, "12:30").await.unwrap();
        let active = list_active(&db).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].time, "12:30");
    }

    #[tokio::test]
    async fn list_active_joins_address() {
        let (db, _dir) = open_temp_db().await;
        let ana = users::get_or_create(&db, "5511").await.unwrap();
        let bia = users::get_or_create(&db, "5522").await.unwrap();
        upsert(&db, &ana.id, MealSlot::Breakfast, "08:00").await.unwrap();
        upsert(&db, &bia.id, MealSlot::Snack, "16:00").await.unwrap();

        let active = list_active(&db).await.unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].address, "5511");
        assert_eq!(active[0].slot, MealSlot::Breakfast);
        assert_eq!(active[1].address, "5522");
    }
}
