//! Badge catalog and awarded badges

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashSet;
use uuid::Uuid;

use learnsmart_common::badges::BadgeThreshold;
use learnsmart_common::Result;

use super::parse_id;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub requirement: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Badge {
    pub fn threshold(&self) -> BadgeThreshold {
        BadgeThreshold {
            id: self.id,
            requirement: self.requirement,
        }
    }
}

fn badge_from_row(row: &SqliteRow) -> Result<Badge> {
    let id: String = row.try_get("id")?;
    Ok(Badge {
        id: parse_id(&id)?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        requirement: row.try_get("requirement")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Whole catalog, cheapest first
pub async fn list_catalog(conn: &mut SqliteConnection) -> Result<Vec<Badge>> {
    let rows = sqlx::query(
        "SELECT id, name, description, image_url, requirement, created_at, updated_at \
         FROM badges ORDER BY requirement ASC, name ASC",
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(badge_from_row).collect()
}

pub async fn find_badge(pool: &SqlitePool, id: Uuid) -> Result<Option<Badge>> {
    let row = sqlx::query(
        "SELECT id, name, description, image_url, requirement, created_at, updated_at \
         FROM badges WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(badge_from_row).transpose()
}

/// Ids of badges a user already holds
pub async fn held_badge_ids(conn: &mut SqliteConnection, user_id: Uuid) -> Result<HashSet<Uuid>> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT badge_id FROM user_badges WHERE user_id = ?")
        .bind(user_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    ids.iter().map(|id| parse_id(id)).collect()
}

/// Award a badge; returns false if it was already held
pub async fn award_badge(conn: &mut SqliteConnection, user_id: Uuid, badge_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO user_badges (user_id, badge_id, awarded_at) VALUES (?, ?, ?)",
    )
    .bind(user_id.to_string())
    .bind(badge_id.to_string())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Badges held by a user, in the order they were earned
pub async fn badges_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Badge>> {
    let rows = sqlx::query(
        r#"
        SELECT b.id, b.name, b.description, b.image_url, b.requirement, b.created_at, b.updated_at
        FROM user_badges ub
        JOIN badges b ON b.id = ub.badge_id
        WHERE ub.user_id = ?
        ORDER BY ub.awarded_at ASC, b.requirement ASC
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(badge_from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::tests::{create_user, test_pool};

    #[tokio::test]
    async fn test_catalog_is_seeded_in_requirement_order() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let catalog = list_catalog(&mut conn).await.unwrap();

        let requirements: Vec<i64> = catalog.iter().map(|b| b.requirement).collect();
        assert_eq!(requirements, vec![100, 500, 1000, 2500, 5000]);
        assert_eq!(catalog[0].name, "Quick Start");
    }

    #[tokio::test]
    async fn test_award_is_idempotent() {
        let pool = test_pool().await;
        let user = create_user(&pool, "b@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        let badge = list_catalog(&mut conn).await.unwrap().remove(0);

        assert!(award_badge(&mut conn, user.id, badge.id).await.unwrap());
        assert!(!award_badge(&mut conn, user.id, badge.id).await.unwrap());

        let held = held_badge_ids(&mut conn, user.id).await.unwrap();
        assert_eq!(held.len(), 1);
        assert!(held.contains(&badge.id));
        drop(conn);

        let owned = badges_for_user(&pool, user.id).await.unwrap();
        assert_eq!(owned, vec![badge]);
    }

    #[tokio::test]
    async fn test_unknown_badge_lookup() {
        let pool = test_pool().await;
        assert!(find_badge(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }
}
