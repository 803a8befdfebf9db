//! Onboarding preferences and personalized recommendations

use axum::{extract::State, Extension, Json};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use learnsmart_common::preferences::{PreferencesPatch, UserPreferences};

use super::{ApiJson, AuthUser};
use crate::db::{courses, users};
use crate::error::{ApiError, ApiResult};
use crate::services::recommender::{self, RecommendationSet};
use crate::AppState;

const UPDATED_MESSAGE: &str = "Preferences updated successfully";

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: &'static str,
    pub recommendations: RecommendationSet,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    /// `{}` until onboarding has stored something
    pub preferences: Value,
    pub has_completed_onboarding: bool,
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

fn preferences_value(preferences: Option<&UserPreferences>) -> ApiResult<Value> {
    match preferences {
        Some(p) => serde_json::to_value(p).map_err(ApiError::internal),
        None => Ok(json!({})),
    }
}

/// POST /api/user-preferences
///
/// Stores the onboarding answers and marks onboarding complete. The reply
/// carries an empty starter path; personalized results come from
/// `/recommendations`.
pub async fn submit_preferences(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ApiJson(preferences): ApiJson<UserPreferences>,
) -> ApiResult<Json<SubmitResponse>> {
    users::save_preferences(&state.db, caller.id, &preferences, true)
        .await?
        .ok_or_else(user_not_found)?;

    info!(user = %caller.id, "Onboarding completed");
    Ok(Json(SubmitResponse {
        message: UPDATED_MESSAGE,
        recommendations: RecommendationSet::basic(),
    }))
}

/// PATCH /api/user-preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ApiJson(patch): ApiJson<PreferencesPatch>,
) -> ApiResult<Json<PreferencesResponse>> {
    if patch.is_empty() {
        return Err(ApiError::BadRequest("No preferences provided".to_string()));
    }

    let user = users::find_by_id(&state.db, caller.id)
        .await?
        .ok_or_else(user_not_found)?;
    let merged = patch.merge_into(user.preferences);

    let user = users::save_preferences(&state.db, caller.id, &merged, false)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(PreferencesResponse {
        message: Some(UPDATED_MESSAGE),
        preferences: preferences_value(user.preferences.as_ref())?,
        has_completed_onboarding: user.has_completed_onboarding,
    }))
}

/// GET /api/user-preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<PreferencesResponse>> {
    let user = users::find_by_id(&state.db, caller.id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(PreferencesResponse {
        message: None,
        preferences: preferences_value(user.preferences.as_ref())?,
        has_completed_onboarding: user.has_completed_onboarding,
    }))
}

/// GET /api/user-preferences/recommendations
pub async fn recommendations(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<RecommendationSet>> {
    let user = users::find_by_id(&state.db, caller.id)
        .await?
        .ok_or_else(user_not_found)?;

    let preferences = user.preferences.ok_or_else(|| {
        ApiError::BadRequest(
            "Please complete the onboarding process to get personalized recommendations"
                .to_string(),
        )
    })?;

    let model = state.chat_model()?;
    let catalog = courses::all_courses(&state.db).await?;
    let set = recommender::recommend(model.as_ref(), &preferences, &catalog).await?;

    info!(
        user = %caller.id,
        recommendations = set.recommendations.len(),
        "Recommendations generated"
    );
    Ok(Json(set))
}
