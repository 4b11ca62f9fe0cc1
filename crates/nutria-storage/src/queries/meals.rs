// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Meal log queries.

use chrono::NaiveDate;
use nutria_core::{MealRecord, NewMeal, NutriaError};
use rusqlite::params;

use crate::database::{Database, map_tr_err, now_timestamp};
use crate::queries::{DATE_FORMAT, TIME_FORMAT, date_column, enum_column, time_column};

const SELECT_MEAL: &str = "SELECT id, user_id, meal_type, food_name, calories, meal_date,
        meal_time, image_analyzed, created_at FROM meals";

fn row_to_meal(row: &rusqlite::Row<'_>) -> rusqlite::Result<MealRecord> {
    Ok(MealRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        slot: enum_column(row, 2)?,
        food_name: row.get(3)?,
        calories: row.get(4)?,
        date: date_column(row, 5)?,
        time: time_column(row, 6)?,
        from_image: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Appends a meal and returns the stored record.
pub async fn add(db: &Database, user_id: &str, meal: &NewMeal) -> Result<MealRecord, NutriaError> {
    if !(meal.calories.is_finite() && meal.calories >= 0.0) {
        return Err(NutriaError::InvalidInput(format!(
            "calories must be a non-negative number, got {}",
            meal.calories
        )));
    }

    let user_id = user_id.to_string();
    let meal = meal.clone();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<MealRecord, rusqlite::Error> {
            conn.execute(
                "INSERT INTO meals (user_id, meal_type, food_name, calories, meal_date,
                    meal_time, image_analyzed, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    user_id,
                    meal.slot.to_string(),
                    meal.food_name,
                    meal.calories,
                    meal.date.format(DATE_FORMAT).to_string(),
                    meal.time.format(TIME_FORMAT).to_string(),
                    meal.from_image,
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(&format!("{SELECT_MEAL} WHERE id = ?1"), params![id], row_to_meal)
        })
        .await
        .map_err(map_tr_err)
}

/// Meals on `date`, ordered by time ascending.
pub async fn on_date(
    db: &Database,
    user_id: &str,
    date: NaiveDate,
) -> Result<Vec<MealRecord>, NutriaError> {
    between(db, user_id, date, date).await
}

/// Meals in the inclusive range, ordered by date then time.
pub async fn between(
    db: &Database,
    user_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<MealRecord>, NutriaError> {
    let user_id = user_id.to_string();
    let start = start.format(DATE_FORMAT).to_string();
    let end = end.format(DATE_FORMAT).to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<MealRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_MEAL} WHERE user_id = ?1 AND meal_date BETWEEN ?2 AND ?3
                 ORDER BY meal_date ASC, meal_time ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![user_id, start, end], row_to_meal)?;
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
    use chrono::NaiveTime;
    use nutria_core::MealSlot;

    fn meal(name: &str, calories: f64, date: NaiveDate, hh: u32, mm: u32) -> NewMeal {
        NewMeal {
            slot: MealSlot::from_hour(hh),
            food_name: name.to_string(),
            calories,
            date,
            time: NaiveTime::from_hms_opt(hh, mm, 0).unwrap(),
            from_image: true,
        }
    }

    #[tokio::test]
    async fn round_trip_preserves_fields_and_orders_by_time() {
        let (db, _dir) = open_temp_db().await;
        let user = users::get_or_create(&db, "5511").await.unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();

        let dinner = meal("Sopa", 220.0, today, 20, 15);
        let breakfast = meal("Pão com ovo", 310.5, today, 7, 30);
        let stored = add(&db, &user.id, &dinner).await.unwrap();
        add(&db, &user.id, &breakfast).await.unwrap();

        assert_eq!(stored.slot, MealSlot::Dinner);
        assert_eq!(stored.food_name, "Sopa");
        assert_eq!(stored.calories, 220.0);
        assert_eq!(stored.date, today);
        assert_eq!(stored.time, dinner.time);
        assert!(stored.from_image);

        let meals = on_date(&db, &user.id, today).await.unwrap();
        let names: Vec<_> = meals.iter().map(|m| m.food_name.as_str()).collect();
        assert_eq!(names, vec!["Pão com ovo", "Sopa"]);
        assert_eq!(meals[0].calories, 310.5);
    }

    #[tokio::test]
    async fn other_days_and_users_are_excluded() {
        let (db, _dir) = open_temp_db().await;
        let ana = users::get_or_create(&db, "ana").await.unwrap();
        let bia = users::get_or_create(&db, "bia").await.unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let next = day.succ_opt().unwrap();

        add(&db, &ana.id, &meal("Arroz", 200.0, day, 12, 0)).await.unwrap();
        add(&db, &ana.id, &meal("Feijão", 150.0, next, 12, 0)).await.unwrap();
        add(&db, &bia.id, &meal("Salada", 80.0, day, 12, 0)).await.unwrap();

        assert_eq!(on_date(&db, &ana.id, day).await.unwrap().len(), 1);
        let week = between(&db, &ana.id, day, next).await.unwrap();
        assert_eq!(week.len(), 2);
        assert_eq!(week[1].date, next);
    }

    #[tokio::test]
    async fn negative_calories_are_rejected() {
        let (db, _dir) = open_temp_db().await;
        let user = users::get_or_create(&db, "5511").await.unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let result = add(&db, &user.id, &meal("Nada", -1.0, day, 9, 0)).await;
        assert!(matches!(result, Err(NutriaError::InvalidInput(_))));
    }
}
