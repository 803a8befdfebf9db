//! learnsmart-api library
//!
//! HTTP service for the learning platform: accounts, the course catalog,
//! enrollments, gamification, onboarding preferences and AI-assisted
//! recommendations and roadmaps.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use sqlx::SqlitePool;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::error;

use learnsmart_common::auth::TokenKeys;

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;
pub mod services;

use error::{ApiError, ApiResult};
use services::{ChatModel, LlmError};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Bearer token signing/validation keys
    pub tokens: TokenKeys,
    /// Chat model for recommendations and roadmaps; `None` when no API key is set
    pub llm: Option<Arc<dyn ChatModel>>,
    pub startup_time: Instant,
}

impl AppState {
    pub fn new(db: SqlitePool, tokens: TokenKeys, llm: Option<Arc<dyn ChatModel>>) -> Self {
        Self {
            db,
            tokens,
            llm,
            startup_time: Instant::now(),
        }
    }

    /// The configured chat model, or 503 when AI features are off
    pub fn chat_model(&self) -> ApiResult<Arc<dyn ChatModel>> {
        self.llm
            .clone()
            .ok_or_else(|| ApiError::from(LlmError::NotConfigured))
    }
}

/// Build application router
///
/// Catalog browsing, the leaderboard, the badge catalog, signup and login are
/// public; everything else requires a bearer token.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post, put};

    let protected = Router::new()
        .route("/api/auth/me", get(api::accounts::me))
        .route("/api/auth/profile", put(api::accounts::update_profile))
        .route("/api/auth/change-password", put(api::accounts::change_password))
        .route("/api/courses", post(api::courses::create_course))
        .route(
            "/api/courses/:id",
            put(api::courses::update_course).delete(api::courses::delete_course),
        )
        .route("/api/courses/:id/outline", put(api::courses::replace_outline))
        .route(
            "/api/enrollments",
            post(api::enrollments::enroll).get(api::enrollments::list_enrollments),
        )
        .route(
            "/api/enrollments/:course_id/lessons/:lesson_id/complete",
            post(api::enrollments::complete_lesson),
        )
        .route("/api/gamification/user-data", get(api::gamification::user_data))
        .route("/api/gamification/update-streak", post(api::gamification::update_streak))
        .route("/api/gamification/add-points", post(api::gamification::add_points))
        .route("/api/gamification/unlock-badge", post(api::gamification::unlock_badge))
        .route(
            "/api/user-preferences",
            post(api::preferences::submit_preferences)
                .patch(api::preferences::update_preferences)
                .get(api::preferences::get_preferences),
        )
        .route(
            "/api/user-preferences/recommendations",
            get(api::preferences::recommendations),
        )
        .route("/api/roadmap/:course_id", get(api::roadmap::generate_roadmap))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let public = Router::new()
        .route("/api/auth/signup", post(api::accounts::signup))
        .route("/api/auth/login", post(api::accounts::login))
        .route("/api/courses", get(api::courses::list_courses))
        .route("/api/courses/:id", get(api::courses::get_course))
        .route("/api/gamification/leaderboard", get(api::gamification::leaderboard))
        .route("/api/gamification/badges", get(api::gamification::badge_catalog))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .fallback(route_not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

/// Last-resort answer for a panicking handler
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "message": "Something broke!" })),
    )
        .into_response()
}
