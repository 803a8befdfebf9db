//! Key/value runtime settings

use sqlx::SqlitePool;
use std::str::FromStr;

use crate::{Error, Result};

/// Read a setting, parsing it with `FromStr`
///
/// Returns `None` if the key is absent.
pub async fn get_setting<T: FromStr>(db: &SqlitePool, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value {
        Some(s) => s.parse::<T>().map(Some).map_err(|_| {
            Error::Config(format!("Failed to parse setting '{}' value: {}", key, s))
        }),
        None => Ok(None),
    }
}

/// Insert or update a setting
pub async fn set_setting<T: ToString>(db: &SqlitePool, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::create_settings_table(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_missing_setting_is_none() {
        let pool = setup_test_db().await;
        let value: Option<i64> = get_setting(&pool, "absent").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_set_then_overwrite() {
        let pool = setup_test_db().await;
        set_setting(&pool, "leaderboard_size", 10).await.unwrap();
        set_setting(&pool, "leaderboard_size", 25).await.unwrap();
        let value: Option<i64> = get_setting(&pool, "leaderboard_size").await.unwrap();
        assert_eq!(value, Some(25));
    }

    #[tokio::test]
    async fn test_unparsable_setting_is_config_error() {
        let pool = setup_test_db().await;
        set_setting(&pool, "leaderboard_size", "ten").await.unwrap();
        let result: Result<Option<i64>> = get_setting(&pool, "leaderboard_size").await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
