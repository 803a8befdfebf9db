//! Database initialization
//!
//! Opens (creating if needed) the SQLite file, applies connection pragmas,
//! creates every table idempotently and seeds defaults on first run.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::badges::DEFAULT_BADGES;
use crate::Result;

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Settings key for the leaderboard length
pub const LEADERBOARD_SIZE_KEY: &str = "leaderboard_size";

/// Default leaderboard length
pub const DEFAULT_LEADERBOARD_SIZE: i64 = 10;

const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Open the database at `db_path` and bring its schema up to date
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and seed defaults on an already-open pool
///
/// Safe to call repeatedly.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_users_table(pool).await?;
    create_badges_table(pool).await?;
    create_user_badges_table(pool).await?;
    create_courses_table(pool).await?;
    create_course_modules_table(pool).await?;
    create_lessons_table(pool).await?;
    create_lesson_resources_table(pool).await?;
    create_enrollments_table(pool).await?;
    create_completed_lessons_table(pool).await?;
    create_achievements_table(pool).await?;

    record_schema_version(pool).await?;
    init_default_settings(pool).await?;
    init_default_badges(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin', 'instructor')),
            avatar TEXT,
            points INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
            level INTEGER NOT NULL DEFAULT 1 CHECK (level >= 1),
            last_login_at TEXT,
            current_streak INTEGER NOT NULL DEFAULT 0 CHECK (current_streak >= 0),
            has_completed_onboarding INTEGER NOT NULL DEFAULT 0,
            preferences TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_points ON users(points DESC)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_badges_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS badges (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL,
            image_url TEXT,
            requirement INTEGER NOT NULL CHECK (requirement >= 0),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_user_badges_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_badges (
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            badge_id TEXT NOT NULL REFERENCES badges(id) ON DELETE CASCADE,
            awarded_at TEXT NOT NULL,
            PRIMARY KEY (user_id, badge_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_courses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            short_intro TEXT NOT NULL,
            category TEXT NOT NULL,
            sub_category TEXT NOT NULL,
            course_type TEXT NOT NULL,
            language TEXT NOT NULL,
            subtitle_languages TEXT NOT NULL,
            skills TEXT NOT NULL,
            instructors TEXT NOT NULL,
            rating TEXT NOT NULL,
            viewers TEXT NOT NULL,
            duration TEXT NOT NULL,
            site TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_courses_category ON courses(category)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_courses_created ON courses(created_at DESC)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_course_modules_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS course_modules (
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            duration TEXT NOT NULL DEFAULT '',
            position INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_course_modules_course ON course_modules(course_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_lessons_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lessons (
            id TEXT PRIMARY KEY,
            module_id TEXT NOT NULL REFERENCES course_modules(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            duration TEXT NOT NULL DEFAULT '',
            video_url TEXT,
            position INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_lessons_module ON lessons(module_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_lesson_resources_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lesson_resources (
            id TEXT PRIMARY KEY,
            lesson_id TEXT NOT NULL REFERENCES lessons(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('PDF', 'VIDEO', 'LINK', 'CODE')),
            url TEXT NOT NULL,
            position INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_enrollments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enrollments (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            course_id TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            progress REAL NOT NULL DEFAULT 0 CHECK (progress >= 0 AND progress <= 100),
            completed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (user_id, course_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_completed_lessons_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS completed_lessons (
            enrollment_id TEXT NOT NULL REFERENCES enrollments(id) ON DELETE CASCADE,
            lesson_id TEXT NOT NULL REFERENCES lessons(id) ON DELETE CASCADE,
            completed_at TEXT NOT NULL,
            PRIMARY KEY (enrollment_id, lesson_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_achievements_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS achievements (
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            code TEXT NOT NULL,
            unlocked_at TEXT NOT NULL,
            PRIMARY KEY (user_id, code)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn record_schema_version(pool: &SqlitePool) -> Result<()> {
    let current: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await?;

    match current {
        Some(v) if v == CURRENT_SCHEMA_VERSION => {
            debug!("Database schema is up to date (v{})", v);
        }
        Some(v) if v > CURRENT_SCHEMA_VERSION => {
            warn!(
                "Database schema version ({}) is newer than code version ({})",
                v, CURRENT_SCHEMA_VERSION
            );
        }
        _ => {
            sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
                .bind(CURRENT_SCHEMA_VERSION)
                .execute(pool)
                .await?;
            info!("Database schema recorded at v{}", CURRENT_SCHEMA_VERSION);
        }
    }

    Ok(())
}

/// Insert settings defaults without overwriting existing values
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(LEADERBOARD_SIZE_KEY)
        .bind(DEFAULT_LEADERBOARD_SIZE.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Seed the badge catalog when it is empty
async fn init_default_badges(pool: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM badges")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Ok(());
    }

    let now = chrono::Utc::now();
    for &(name, description, requirement) in DEFAULT_BADGES {
        sqlx::query(
            r#"
            INSERT INTO badges (id, name, description, image_url, requirement, created_at, updated_at)
            VALUES (?, ?, ?, NULL, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(description)
        .bind(requirement)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
    }

    info!("Seeded {} default badges", DEFAULT_BADGES.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        create_schema(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();

        let badges: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM badges")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(badges, DEFAULT_BADGES.len() as i64);

        let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(versions, 1);
    }
}
