// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation history queries.
//!
//! Turns are ordered by `(created_at, id)`; the autoincrement id breaks ties
//! between turns written in the same millisecond.

use nutria_core::{ConversationTurn, NutriaError, Role};
use rusqlite::params;

use crate::database::{Database, map_tr_err, now_timestamp};
use crate::queries::{enum_column, sql_limit};

fn row_to_turn(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationTurn> {
    Ok(ConversationTurn {
        id: row.get(0)?,
        user_id: row.get(1)?,
        role: enum_column(row, 2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Appends a turn.
pub async fn append(
    db: &Database,
    user_id: &str,
    role: Role,
    content: &str,
) -> Result<ConversationTurn, NutriaError> {
    let user_id = user_id.to_string();
    let content = content.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<ConversationTurn, rusqlite::Error> {
            conn.execute(
                "INSERT INTO conversation_history (user_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, role.to_string(), content, now],
            )?;
            Ok(ConversationTurn {
                id: conn.last_insert_rowid(),
                user_id,
                role,
                content,
                created_at: now,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// The newest `limit` turns, returned oldest first.
pub async fn recent(
    db: &Database,
    user_id: &str,
    limit: usize,
) -> Result<Vec<ConversationTurn>, NutriaError> {
    let user_id = user_id.to_string();
    let mut turns = db
        .connection()
        .call(move |conn| -> Result<Vec<ConversationTurn>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, role, content, created_at
                 FROM conversation_history WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![user_id, sql_limit(limit)], row_to_turn)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;
    turns.reverse();
    Ok(turns)
}

/// Deletes all but the newest `keep_last` turns. Returns the number deleted.
pub async fn trim(db: &Database, user_id: &str, keep_last: usize) -> Result<usize, NutriaError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM conversation_history
                 WHERE user_id = ?1 AND id NOT IN (
                     SELECT id FROM conversation_history WHERE user_id = ?1
                     ORDER BY created_at DESC, id DESC LIMIT ?2
                 )",
                params![user_id, sql_limit(keep_last)],
            )
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
    async fn recent_returns_newest_in_chronological_order() {
        let (db, _dir) = open_temp_db().await;
        let user = users::get_or_create(&db, "5511").await.unwrap();

        for i in 0..5 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            append(&db, &user.id, role, &format!("turn {i}")).await.unwrap();
        }

        let turns = recent(&db, &user.id, 3).await.unwrap();
        let contents: Vec<_> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["turn 2", "turn 3", "turn 4"]);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn trim_keeps_exactly_the_newest() {
        let (db, _dir) = open_temp_db().await;
        let user = users::get_or_create(&db, "5511").await.unwrap();
        let other = users::get_or_create(&db, "5522").await.unwrap();

        for i in 0..12 {
            append(&db, &user.id, Role::User, &format!("m{i}")).await.unwrap();
        }
        append(&db, &other.id, Role::User, "untouched").await.unwrap();

        let removed = trim(&db, &user.id, 4).await.unwrap();
        assert_eq!(removed, 8);

        let remaining = recent(&db, &user.id, 100).await.unwrap();
        let contents: Vec<_> = remaining.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["m8", "m9", "m10", "m11"]);
        assert_eq!(recent(&db, &other.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn trim_below_limit_is_noop() {
        let (db, _dir) = open_temp_db().await;
        let user = users::get_or_create(&db, "5511").await.unwrap();
        append(&db, &user.id, Role::User, "only").await.unwrap();
        assert_eq!(trim(&db, &user.id, 50).await.unwrap(), 0);
    }
}
