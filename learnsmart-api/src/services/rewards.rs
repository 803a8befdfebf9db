//! Point awards
//!
//! Every award follows the same steps on one connection: add the points,
//! raise the stored level if the new total reached a higher one, then scan
//! the badge catalog and record newly reached badges.

use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use learnsmart_common::badges::{newly_unlocked, BadgeThreshold};
use learnsmart_common::leveling::{clamp_points, level_for_points, level_progress};
use learnsmart_common::{Error, LevelProgress, Result};

use crate::db::{badges, users};

/// Outcome of an award
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsAward {
    pub points: i64,
    pub level: i64,
    pub level_progress: LevelProgress,
    pub new_badges: Vec<badges::Badge>,
}

/// Add `amount` points (may be zero) to a user
///
/// Run inside a transaction when combined with other writes.
pub async fn award_points(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    amount: i64,
) -> Result<PointsAward> {
    if amount < 0 {
        return Err(Error::InvalidInput("Point awards must not be negative".to_string()));
    }

    let user = users::find_by_id_conn(conn, user_id)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

    let points = user.points.saturating_add(amount);
    let computed_level = i64::from(level_for_points(clamp_points(points)));
    // awards only ever raise the stored level
    let level = user.level.max(computed_level);

    if amount > 0 || level != user.level {
        users::set_points_and_level(conn, user_id, points, level).await?;
    }
    if level > user.level {
        info!(user = %user_id, from = user.level, to = level, "Level up");
    }

    let new_badges = scan_badges(conn, user_id, points).await?;

    Ok(PointsAward {
        points,
        level,
        level_progress: level_progress(clamp_points(points)),
        new_badges,
    })
}

/// Award every catalog badge the point total has reached
pub async fn scan_badges(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    points: i64,
) -> Result<Vec<badges::Badge>> {
    let catalog = badges::list_catalog(conn).await?;
    let held = badges::held_badge_ids(conn, user_id).await?;
    let thresholds: Vec<BadgeThreshold> = catalog.iter().map(badges::Badge::threshold).collect();

    let unlocked = newly_unlocked(points, &thresholds, &held);
    let mut awarded = Vec::with_capacity(unlocked.len());
    for badge in catalog.into_iter().filter(|b| unlocked.contains(&b.id)) {
        if badges::award_badge(conn, user_id, badge.id).await? {
            info!(user = %user_id, badge = %badge.name, "Badge unlocked");
            awarded.push(badge);
        }
    }

    Ok(awarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::tests::{create_user, test_pool};

    #[tokio::test]
    async fn test_award_raises_level_and_unlocks_badges() {
        let pool = test_pool().await;
        let user = create_user(&pool, "r@example.com").await;

        let mut conn = pool.acquire().await.unwrap();
        let award = award_points(&mut conn, user.id, 1000).await.unwrap();

        assert_eq!(award.points, 1000);
        assert_eq!(award.level, 2);
        assert_eq!(award.level_progress.current, 0);
        assert_eq!(award.level_progress.next_level, 1800);
        let names: Vec<&str> = award.new_badges.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Quick Start", "Rising Star", "Point Collector"]);

        // nothing new at the same total
        let again = award_points(&mut conn, user.id, 0).await.unwrap();
        assert!(again.new_badges.is_empty());
        assert_eq!(again.points, 1000);
    }

    #[tokio::test]
    async fn test_award_accumulates() {
        let pool = test_pool().await;
        let user = create_user(&pool, "acc@example.com").await;

        let mut conn = pool.acquire().await.unwrap();
        award_points(&mut conn, user.id, 60).await.unwrap();
        let award = award_points(&mut conn, user.id, 50).await.unwrap();
        assert_eq!(award.points, 110);
        assert_eq!(award.level, 1);
        assert_eq!(award.new_badges.len(), 1);
        assert_eq!(award.new_badges[0].name, "Quick Start");
    }

    #[tokio::test]
    async fn test_negative_award_rejected() {
        let pool = test_pool().await;
        let user = create_user(&pool, "neg@example.com").await;
        let mut conn = pool.acquire().await.unwrap();
        assert!(matches!(
            award_points(&mut conn, user.id, -5).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_user_not_found() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        assert!(matches!(
            award_points(&mut conn, Uuid::new_v4(), 5).await,
            Err(Error::NotFound(_))
        ));
    }
}
