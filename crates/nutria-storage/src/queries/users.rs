// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profile queries.

use nutria_core::{NutriaError, ProfileUpdate, UserProfile};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err, now_timestamp};
use crate::queries::enum_column;

const SELECT_USER: &str = "SELECT id, address, name, weight_kg, height_cm, age, gender, goal,
        created_at, updated_at FROM users";

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(0)?,
        address: row.get(1)?,
        name: row.get(2)?,
        weight_kg: row.get(3)?,
        height_cm: row.get(4)?,
        age: row.get(5)?,
        gender: enum_column(row, 6)?,
        goal: enum_column(row, 7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Returns the profile for `address`, inserting an empty one if absent.
pub async fn get_or_create(db: &Database, address: &str) -> Result<UserProfile, NutriaError> {
    let address = address.to_string();
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<UserProfile, rusqlite::Error> {
            conn.execute(
                "INSERT INTO users (id, address, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(address) DO NOTHING",
                params![id, address, now],
            )?;
            conn.query_row(
                &format!("{SELECT_USER} WHERE address = ?1"),
                params![address],
                row_to_profile,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Returns the profile for `address` if one exists.
pub async fn get_by_address(
    db: &Database,
    address: &str,
) -> Result<Option<UserProfile>, NutriaError> {
    let address = address.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<UserProfile>, rusqlite::Error> {
            conn.query_row(
                &format!("{SELECT_USER} WHERE address = ?1"),
                params![address],
                row_to_profile,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Merges the set fields of `update` into the profile and bumps `updated_at`.
pub async fn update(
    db: &Database,
    user_id: &str,
    update: &ProfileUpdate,
) -> Result<UserProfile, NutriaError> {
    let user_id = user_id.to_string();
    let update = update.clone();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<UserProfile, rusqlite::Error> {
            conn.execute(
                "UPDATE users SET
                    name = COALESCE(?2, name),
                    weight_kg = COALESCE(?3, weight_kg),
                    height_cm = COALESCE(?4, height_cm),
                    age = COALESCE(?5, age),
                    gender = COALESCE(?6, gender),
                    goal = COALESCE(?7, goal),
                    updated_at = ?8
                 WHERE id = ?1",
                params![
                    user_id,
                    update.name,
                    update.weight_kg,
                    update.height_cm,
                    update.age,
                    update.gender.map(|g| g.to_string()),
                    update.goal.map(|g| g.to_string()),
                    now,
                ],
            )?;
            conn.query_row(
                &format!("{SELECT_USER} WHERE id = ?1"),
                params![user_id],
                row_to_profile,
            )
        })
        .await
        .map_err(map_tr_err)
}
