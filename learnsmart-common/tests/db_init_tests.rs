//! Database initialization against a real file

use learnsmart_common::db::{get_setting, init_database, DEFAULT_LEADERBOARD_SIZE, LEADERBOARD_SIZE_KEY};
use tempfile::TempDir;

#[tokio::test]
async fn test_init_creates_file_and_tables() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("learnsmart.db");

    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists());

    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();

    for expected in [
        "achievements",
        "badges",
        "completed_lessons",
        "course_modules",
        "courses",
        "enrollments",
        "lesson_resources",
        "lessons",
        "schema_version",
        "settings",
        "user_badges",
        "users",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
    }

    let size: Option<i64> = get_setting(&pool, LEADERBOARD_SIZE_KEY).await.unwrap();
    assert_eq!(size, Some(DEFAULT_LEADERBOARD_SIZE));
}

#[tokio::test]
async fn test_reopen_keeps_badges_and_settings() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("learnsmart.db");

    let pool = init_database(&db_path).await.unwrap();
    learnsmart_common::db::set_setting(&pool, LEADERBOARD_SIZE_KEY, 25).await.unwrap();
    let first_ids: Vec<String> = sqlx::query_scalar("SELECT id FROM badges ORDER BY requirement")
        .fetch_all(&pool)
        .await
        .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    let second_ids: Vec<String> = sqlx::query_scalar("SELECT id FROM badges ORDER BY requirement")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(first_ids, second_ids);
    assert_eq!(first_ids.len(), 5);

    let size: Option<i64> = get_setting(&pool, LEADERBOARD_SIZE_KEY).await.unwrap();
    assert_eq!(size, Some(25));
}

#[tokio::test]
async fn test_foreign_keys_enforced() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("fk.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO user_badges (user_id, badge_id, awarded_at) VALUES ('nobody', 'nothing', '2024-01-01')",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err());
}
