//! Course roadmap endpoint

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::courses::parse_course_id;
use super::AuthUser;
use crate::db::courses;
use crate::error::{ApiError, ApiResult};
use crate::services::roadmap::{self, RoadmapTopic};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RoadmapCourse {
    pub id: Uuid,
    pub title: String,
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct RoadmapResponse {
    pub success: bool,
    pub roadmap: Vec<RoadmapTopic>,
    pub course: RoadmapCourse,
}

/// GET /api/roadmap/:course_id
pub async fn generate_roadmap(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(course_id): Path<String>,
) -> ApiResult<Json<RoadmapResponse>> {
    let course_id = parse_course_id(&course_id)?;
    let course = courses::find_course(&state.db, course_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    let model = state.chat_model()?;
    let topics = roadmap::generate_roadmap(model.as_ref(), &course).await?;

    info!(user = %caller.id, course = %course.id, topics = topics.len(), "Roadmap generated");
    Ok(Json(RoadmapResponse {
        success: true,
        roadmap: topics,
        course: RoadmapCourse {
            id: course.id,
            title: course.fields.title,
            category: course.fields.category,
        },
    }))
}
