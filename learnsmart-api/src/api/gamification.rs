//! Gamification endpoints: points, levels, badges, streaks, leaderboard

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use learnsmart_common::db::{get_setting, DEFAULT_LEADERBOARD_SIZE, LEADERBOARD_SIZE_KEY};
use learnsmart_common::leveling::{clamp_points, level_for_points, level_progress};
use learnsmart_common::streak::apply_login;
use learnsmart_common::LevelProgress;

use super::{ApiJson, AuthUser};
use crate::db::achievements::{self, UnlockedAchievement};
use crate::db::badges::{self, Badge};
use crate::db::{begin_write, users};
use crate::error::{ApiError, ApiResult};
use crate::services::rewards::{award_points, PointsAward};
use crate::AppState;

const MAX_LEADERBOARD_SIZE: i64 = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataResponse {
    pub name: String,
    pub points: i64,
    pub level: i64,
    pub badges: Vec<Badge>,
    pub current_streak: i64,
    pub last_login_at: Option<DateTime<Utc>>,
    pub level_progress: LevelProgress,
    pub achievements: Vec<UnlockedAchievement>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub name: String,
    pub points: i64,
    pub level: i64,
    pub level_progress: LevelProgress,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub success: bool,
    pub data: Vec<LeaderboardEntry>,
}

#[derive(Debug, Serialize)]
pub struct BadgeCatalogResponse {
    pub success: bool,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakInfo {
    pub current: i64,
    pub last_login: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakResponse {
    pub points: i64,
    pub level: i64,
    pub level_progress: LevelProgress,
    pub streak: StreakInfo,
    pub new_badges: Vec<Badge>,
}

/// `amount` is checked by hand so non-numbers get the same 400 as negatives
#[derive(Debug, Deserialize)]
pub struct AddPointsRequest {
    #[serde(default)]
    pub amount: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockBadgeRequest {
    #[serde(default)]
    pub badge_id: Value,
}

#[derive(Debug, Serialize)]
pub struct UserBadgesResponse {
    pub badges: Vec<Badge>,
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

/// GET /api/gamification/user-data
///
/// The stored level is re-synced from the point total before answering.
pub async fn user_data(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<UserDataResponse>> {
    let mut user = users::find_by_id(&state.db, caller.id)
        .await?
        .ok_or_else(user_not_found)?;

    let points = clamp_points(user.points);
    let level = i64::from(level_for_points(points));
    if level != user.level {
        debug!(user = %user.id, from = user.level, to = level, "Re-syncing level from points");
        users::sync_level(&state.db, user.id, level).await?;
        user.level = level;
    }

    Ok(Json(UserDataResponse {
        badges: badges::badges_for_user(&state.db, user.id).await?,
        achievements: achievements::list_for_user(&state.db, user.id).await?,
        level_progress: level_progress(points),
        name: user.name,
        points: user.points,
        level: user.level,
        current_streak: user.current_streak,
        last_login_at: user.last_login_at,
    }))
}

/// GET /api/gamification/leaderboard
pub async fn leaderboard(State(state): State<AppState>) -> ApiResult<Json<LeaderboardResponse>> {
    let size = get_setting::<i64>(&state.db, LEADERBOARD_SIZE_KEY)
        .await?
        .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
        .clamp(1, MAX_LEADERBOARD_SIZE);

    let rows = users::top_by_points(&state.db, size).await?;
    if rows.is_empty() {
        return Err(ApiError::NotFound("No leaderboard data available".to_string()));
    }

    let data = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| LeaderboardEntry {
            rank: index + 1,
            name: if row.name.trim().is_empty() {
                "Anonymous".to_string()
            } else {
                row.name
            },
            level_progress: level_progress(clamp_points(row.points)),
            points: row.points,
            level: row.level,
        })
        .collect();

    Ok(Json(LeaderboardResponse {
        success: true,
        data,
    }))
}

/// GET /api/gamification/badges
pub async fn badge_catalog(State(state): State<AppState>) -> ApiResult<Json<BadgeCatalogResponse>> {
    let mut conn = state.db.acquire().await?;
    let badges = badges::list_catalog(&mut conn).await?;
    Ok(Json(BadgeCatalogResponse {
        success: true,
        badges,
    }))
}

/// POST /api/gamification/update-streak
pub async fn update_streak(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<StreakResponse>> {
    let mut tx = begin_write(&state.db).await?;

    let user = users::find_by_id_conn(&mut *tx, caller.id)
        .await?
        .ok_or_else(user_not_found)?;

    let update = apply_login(user.current_streak, user.last_login_at, Utc::now());
    users::set_streak(&mut *tx, user.id, update.streak, update.last_login_at).await?;
    let award = award_points(&mut *tx, user.id, update.points_awarded).await?;

    tx.commit().await?;

    if update.points_awarded > 0 {
        info!(user = %user.id, streak = update.streak, "Daily login points awarded");
    }

    Ok(Json(StreakResponse {
        points: award.points,
        level: award.level,
        level_progress: award.level_progress,
        streak: StreakInfo {
            current: update.streak,
            last_login: update.last_login_at,
        },
        new_badges: award.new_badges,
    }))
}

/// POST /api/gamification/add-points
pub async fn add_points(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ApiJson(req): ApiJson<AddPointsRequest>,
) -> ApiResult<Json<PointsAward>> {
    let amount = req
        .amount
        .as_i64()
        .filter(|amount| *amount > 0)
        .ok_or_else(|| ApiError::BadRequest("Invalid amount".to_string()))?;

    let mut tx = begin_write(&state.db).await?;
    let award = award_points(&mut *tx, caller.id, amount).await?;
    tx.commit().await?;

    info!(user = %caller.id, amount, total = award.points, "Points added");
    Ok(Json(award))
}

/// POST /api/gamification/unlock-badge
///
/// Unlocking a badge the user already holds is a no-op.
pub async fn unlock_badge(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ApiJson(req): ApiJson<UnlockBadgeRequest>,
) -> ApiResult<Json<UserBadgesResponse>> {
    let raw = req
        .badge_id
        .as_str()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Invalid badge ID".to_string()))?;
    let badge_id = Uuid::parse_str(raw)
        .map_err(|_| ApiError::BadRequest("Invalid badge ID format".to_string()))?;

    let badge = badges::find_badge(&state.db, badge_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Badge not found".to_string()))?;

    if users::find_by_id(&state.db, caller.id).await?.is_none() {
        return Err(user_not_found());
    }

    let mut conn = state.db.acquire().await?;
    if badges::award_badge(&mut conn, caller.id, badge.id).await? {
        info!(user = %caller.id, badge = %badge.name, "Badge unlocked manually");
    }
    drop(conn);

    Ok(Json(UserBadgesResponse {
        badges: badges::badges_for_user(&state.db, caller.id).await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_points_amount_shapes() {
        let parse = |body: &str| -> Option<i64> {
            let req: AddPointsRequest = serde_json::from_str(body).unwrap();
            req.amount.as_i64().filter(|a| *a > 0)
        };
        assert_eq!(parse(r#"{"amount": 25}"#), Some(25));
        assert_eq!(parse(r#"{"amount": 0}"#), None);
        assert_eq!(parse(r#"{"amount": -5}"#), None);
        assert_eq!(parse(r#"{"amount": "10"}"#), None);
        assert_eq!(parse(r#"{"amount": 2.5}"#), None);
        assert_eq!(parse("{}"), None);
    }
}
