//! Unlocked achievements

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use learnsmart_common::achievements::describe;
use learnsmart_common::Result;

/// An achievement a user has unlocked
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedAchievement {
    pub code: String,
    pub name: String,
    pub description: String,
    pub unlocked_at: DateTime<Utc>,
}

/// Record an achievement; returns false if the user already had it
pub async fn unlock(conn: &mut SqliteConnection, user_id: Uuid, code: &str) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO achievements (user_id, code, unlocked_at) VALUES (?, ?, ?)",
    )
    .bind(user_id.to_string())
    .bind(code)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<UnlockedAchievement>> {
    let rows = sqlx::query(
        "SELECT code, unlocked_at FROM achievements WHERE user_id = ? ORDER BY unlocked_at ASC",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let code: String = row.try_get("code")?;
            let (name, description) = match describe(&code) {
                Some(info) => (info.name.to_string(), info.description.to_string()),
                None => (code.clone(), String::new()),
            };
            Ok(UnlockedAchievement {
                code,
                name,
                description,
                unlocked_at: row.try_get("unlocked_at")?,
            })
        })
        .collect()
}
