//! Enrollment and lesson completion endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use learnsmart_common::course::CourseDetail;

use super::courses::parse_course_id;
use super::{ApiJson, AuthUser};
use crate::db::courses;
use crate::db::enrollments::{self, Enrollment};
use crate::error::{ApiError, ApiResult};
use crate::services::progress::{self, LessonCompletion};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    #[serde(default)]
    pub course_id: String,
}

/// Enrollment as returned to its owner
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub course_id: Uuid,
    pub progress: f64,
    pub completed_lessons: Vec<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub course: Option<CourseDetail>,
}

impl EnrollmentView {
    fn new(enrollment: Enrollment, course: Option<CourseDetail>) -> Self {
        Self {
            id: enrollment.id,
            course_id: enrollment.course_id,
            progress: enrollment.progress,
            completed_lessons: enrollment.completed_lessons,
            completed_at: enrollment.completed_at,
            created_at: enrollment.created_at,
            course,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnrollmentResponse {
    pub success: bool,
    pub enrollment: EnrollmentView,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentListResponse {
    pub success: bool,
    pub enrollments: Vec<EnrollmentView>,
}

#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub success: bool,
    #[serde(flatten)]
    pub completion: LessonCompletion,
}

/// POST /api/enrollments
pub async fn enroll(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ApiJson(req): ApiJson<EnrollRequest>,
) -> ApiResult<(StatusCode, Json<EnrollmentResponse>)> {
    if req.course_id.trim().is_empty() {
        return Err(ApiError::BadRequest("courseId is required".to_string()));
    }
    let course_id = parse_course_id(&req.course_id)?;
    let course = courses::find_course(&state.db, course_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    let enrollment = enrollments::create_enrollment(&state.db, caller.id, course_id).await?;
    info!(user = %caller.id, course = %course_id, "Enrolled");

    Ok((
        StatusCode::CREATED,
        Json(EnrollmentResponse {
            success: true,
            enrollment: EnrollmentView::new(enrollment, Some(course.to_detail(Vec::new()))),
        }),
    ))
}

/// GET /api/enrollments
pub async fn list_enrollments(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<EnrollmentListResponse>> {
    let rows = enrollments::list_for_user(&state.db, caller.id).await?;

    let mut views = Vec::with_capacity(rows.len());
    for enrollment in rows {
        let course = courses::find_course(&state.db, enrollment.course_id)
            .await?
            .map(|c| c.to_detail(Vec::new()));
        views.push(EnrollmentView::new(enrollment, course));
    }

    Ok(Json(EnrollmentListResponse {
        success: true,
        enrollments: views,
    }))
}

/// POST /api/enrollments/:course_id/lessons/:lesson_id/complete
pub async fn complete_lesson(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path((course_id, lesson_id)): Path<(String, String)>,
) -> ApiResult<Json<CompletionResponse>> {
    let course_id = parse_course_id(&course_id)?;
    let lesson_id = Uuid::parse_str(lesson_id.trim())
        .map_err(|_| ApiError::NotFound("Lesson not found in this course".to_string()))?;

    let completion = progress::complete_lesson(&state.db, caller.id, course_id, lesson_id).await?;

    Ok(Json(CompletionResponse {
        success: true,
        completion,
    }))
}
