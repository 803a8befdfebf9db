//! User accounts and their gamification columns

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use learnsmart_common::auth::Role;
use learnsmart_common::preferences::UserPreferences;
use learnsmart_common::{Error, Result};

use super::parse_id;

/// Stored user account
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub points: i64,
    pub level: i64,
    pub last_login_at: Option<DateTime<Utc>>,
    pub current_streak: i64,
    pub has_completed_onboarding: bool,
    pub preferences: Option<UserPreferences>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account fields safe to return to clients (no password hash)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub has_completed_onboarding: bool,
    pub preferences: Option<UserPreferences>,
}

impl From<&User> for SafeUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            avatar: user.avatar.clone(),
            has_completed_onboarding: user.has_completed_onboarding,
            preferences: user.preferences.clone(),
        }
    }
}

/// New account to insert
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Leaderboard row
#[derive(Debug, Clone)]
pub struct LeaderRow {
    pub name: String,
    pub points: i64,
    pub level: i64,
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, avatar, points, level, \
    last_login_at, current_streak, has_completed_onboarding, preferences, created_at, updated_at";

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let id: String = row.try_get("id")?;
    let role: String = row.try_get("role")?;
    let preferences: Option<String> = row.try_get("preferences")?;

    let preferences = preferences
        .map(|raw| serde_json::from_str::<UserPreferences>(&raw))
        .transpose()
        .map_err(|e| Error::Internal(format!("Corrupt preferences for user {}: {}", id, e)))?;

    Ok(User {
        id: parse_id(&id)?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: role.parse()?,
        avatar: row.try_get("avatar")?,
        points: row.try_get("points")?,
        level: row.try_get("level")?,
        last_login_at: row.try_get("last_login_at")?,
        current_streak: row.try_get("current_streak")?,
        has_completed_onboarding: row.try_get("has_completed_onboarding")?,
        preferences,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Emails are compared and stored lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Insert a new account
///
/// A duplicate email surfaces as `Error::Conflict`.
pub async fn insert_user(pool: &SqlitePool, new_user: NewUser) -> Result<User> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let email = normalize_email(&new_user.email);

    let result = sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(new_user.name.trim())
    .bind(&email)
    .bind(&new_user.password_hash)
    .bind(new_user.role.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(_) => {}
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Err(Error::Conflict("Email already registered".to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("User {} vanished after insert", id)))
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Same lookup on a transaction's connection
pub async fn find_by_id_conn(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Update name and/or avatar; absent values are kept
pub async fn update_profile(
    pool: &SqlitePool,
    id: Uuid,
    name: Option<&str>,
    avatar: Option<&str>,
) -> Result<Option<User>> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET name = COALESCE(?, name),
            avatar = COALESCE(?, avatar),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(name.map(str::trim))
    .bind(avatar)
    .bind(Utc::now())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    find_by_id(pool, id).await
}

pub async fn update_password(pool: &SqlitePool, id: Uuid, password_hash: &str) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Change the role of the account with `email`; false when no such account
pub async fn set_role(pool: &SqlitePool, email: &str, role: Role) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE email = ?")
        .bind(role.as_str())
        .bind(Utc::now())
        .bind(normalize_email(email))
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Store preferences; `complete_onboarding` also sets the onboarding flag
pub async fn save_preferences(
    pool: &SqlitePool,
    id: Uuid,
    preferences: &UserPreferences,
    complete_onboarding: bool,
) -> Result<Option<User>> {
    let encoded = serde_json::to_string(preferences)
        .map_err(|e| Error::Internal(format!("Failed to encode preferences: {}", e)))?;

    let result = sqlx::query(
        r#"
        UPDATE users
        SET preferences = ?,
            has_completed_onboarding = CASE WHEN ? THEN 1 ELSE has_completed_onboarding END,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(encoded)
    .bind(complete_onboarding)
    .bind(Utc::now())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    find_by_id(pool, id).await
}

/// Write points and level together
pub async fn set_points_and_level(
    conn: &mut SqliteConnection,
    id: Uuid,
    points: i64,
    level: i64,
) -> Result<()> {
    sqlx::query("UPDATE users SET points = ?, level = ?, updated_at = ? WHERE id = ?")
        .bind(points)
        .bind(level)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Correct a stored level that disagrees with the point total
pub async fn sync_level(pool: &SqlitePool, id: Uuid, level: i64) -> Result<()> {
    sqlx::query("UPDATE users SET level = ?, updated_at = ? WHERE id = ?")
        .bind(level)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn set_streak(
    conn: &mut SqliteConnection,
    id: Uuid,
    streak: i64,
    last_login_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE users SET current_streak = ?, last_login_at = ?, updated_at = ? WHERE id = ?",
    )
    .bind(streak)
    .bind(last_login_at)
    .bind(Utc::now())
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Highest point totals first; ties broken by earliest signup
pub async fn top_by_points(pool: &SqlitePool, limit: i64) -> Result<Vec<LeaderRow>> {
    let rows = sqlx::query(
        "SELECT name, points, level FROM users ORDER BY points DESC, created_at ASC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(LeaderRow {
                name: row.try_get("name")?,
                points: row.try_get("points")?,
                level: row.try_get("level")?,
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    pub(crate) async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        learnsmart_common::db::create_schema(&pool).await.unwrap();
        pool
    }

    pub(crate) async fn create_user(pool: &SqlitePool, email: &str) -> User {
        insert_user(
            pool,
            NewUser {
                name: "Test Learner".to_string(),
                email: email.to_string(),
                password_hash: "$argon2id$placeholder".to_string(),
                role: Role::User,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_defaults() {
        let pool = test_pool().await;
        let user = create_user(&pool, "Ada@Example.com").await;

        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.points, 0);
        assert_eq!(user.level, 1);
        assert_eq!(user.current_streak, 0);
        assert!(user.last_login_at.is_none());
        assert!(!user.has_completed_onboarding);
        assert!(user.preferences.is_none());
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let pool = test_pool().await;
        create_user(&pool, "ada@example.com").await;
        let err = insert_user(
            &pool,
            NewUser {
                name: "Other".to_string(),
                email: "ADA@example.com ".to_string(),
                password_hash: "x".to_string(),
                role: Role::User,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_find_by_email_ignores_case() {
        let pool = test_pool().await;
        let user = create_user(&pool, "grace@example.com").await;
        let found = find_by_email(&pool, "GRACE@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn test_profile_update_keeps_absent_fields() {
        let pool = test_pool().await;
        let user = create_user(&pool, "p@example.com").await;

        let updated = update_profile(&pool, user.id, None, Some("https://img/a.png"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Test Learner");
        assert_eq!(updated.avatar.as_deref(), Some("https://img/a.png"));

        assert!(update_profile(&pool, Uuid::new_v4(), Some("x"), None)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_preferences_round_trip() {
        let pool = test_pool().await;
        let user = create_user(&pool, "prefs@example.com").await;
        let prefs = UserPreferences {
            learning_style: "visual".to_string(),
            ..Default::default()
        };

        let saved = save_preferences(&pool, user.id, &prefs, true).await.unwrap().unwrap();
        assert!(saved.has_completed_onboarding);
        assert_eq!(saved.preferences, Some(prefs));
    }

    #[tokio::test]
    async fn test_leaderboard_order() {
        let pool = test_pool().await;
        let a = create_user(&pool, "a@example.com").await;
        let b = create_user(&pool, "b@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        set_points_and_level(&mut conn, a.id, 50, 1).await.unwrap();
        set_points_and_level(&mut conn, b.id, 1500, 2).await.unwrap();
        drop(conn);

        let rows = top_by_points(&pool, 10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].points, 1500);
        assert_eq!(rows[1].points, 50);
    }

    #[tokio::test]
    async fn test_set_role() {
        let pool = test_pool().await;
        let user = create_user(&pool, "teach@example.com").await;

        assert!(set_role(&pool, "TEACH@example.com", Role::Instructor).await.unwrap());
        let found = find_by_id(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(found.role, Role::Instructor);

        assert!(!set_role(&pool, "nobody@example.com", Role::Admin).await.unwrap());
    }
}
