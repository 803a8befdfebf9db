//! Course catalog endpoints
//!
//! Browsing is public. Creating, editing, deleting and replacing a course
//! outline require an instructor or admin token.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use learnsmart_common::course::{CourseDetail, CourseFields, CoursePatch, ModuleDraft};

use super::{ApiJson, ApiQuery, AuthUser};
use crate::db::begin_write;
use crate::db::courses::{self, CourseFilter};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, PAGE_SIZE};
use crate::AppState;

/// Query parameters for the listing
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    pub category: Option<String>,
    /// Free-text search over title, intro and skills
    pub q: Option<String>,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseListResponse {
    pub success: bool,
    pub courses: Vec<CourseDetail>,
    pub page: i64,
    pub total_pages: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct CourseResponse {
    pub success: bool,
    pub course: CourseDetail,
}

#[derive(Debug, Deserialize)]
pub struct OutlineRequest {
    pub modules: Vec<ModuleDraft>,
}

fn course_not_found() -> ApiError {
    ApiError::NotFound("Course not found".to_string())
}

/// Malformed ids cannot name a course
pub(crate) fn parse_course_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| course_not_found())
}

async fn detail_with_outline(state: &AppState, id: Uuid) -> ApiResult<CourseDetail> {
    let course = courses::find_course(&state.db, id)
        .await?
        .ok_or_else(course_not_found)?;
    let modules = courses::load_outline(&state.db, id).await?;
    Ok(course.to_detail(modules))
}

/// GET /api/courses
pub async fn list_courses(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<CourseListResponse>> {
    let filter = CourseFilter {
        category: query.category,
        query: query.q,
    };

    let total = courses::count_courses(&state.db, &filter).await?;
    let p = calculate_pagination(total, query.page);
    let page = courses::list_courses(&state.db, &filter, PAGE_SIZE, p.offset).await?;

    Ok(Json(CourseListResponse {
        success: true,
        courses: page.iter().map(|c| c.to_detail(Vec::new())).collect(),
        page: p.page,
        total_pages: p.total_pages,
        total,
    }))
}

/// GET /api/courses/:id
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CourseResponse>> {
    let id = parse_course_id(&id)?;
    Ok(Json(CourseResponse {
        success: true,
        course: detail_with_outline(&state, id).await?,
    }))
}

/// POST /api/courses
///
/// The body uses the catalog column names; every column is required.
pub async fn create_course(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ApiJson(body): ApiJson<CoursePatch>,
) -> ApiResult<(StatusCode, Json<CourseResponse>)> {
    caller.require_course_author()?;

    let mut fields = CourseFields::default();
    body.apply_to(&mut fields)?;
    let course = courses::insert_course(&state.db, &fields).await?;

    info!(course = %course.id, author = %caller.id, "Course created");
    Ok((
        StatusCode::CREATED,
        Json(CourseResponse {
            success: true,
            course: course.to_detail(Vec::new()),
        }),
    ))
}

/// PUT /api/courses/:id
pub async fn update_course(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<CoursePatch>,
) -> ApiResult<Json<CourseResponse>> {
    caller.require_course_author()?;
    let id = parse_course_id(&id)?;

    let mut course = courses::find_course(&state.db, id)
        .await?
        .ok_or_else(course_not_found)?;
    patch.apply_to(&mut course.fields)?;
    let course = courses::update_course(&state.db, &course).await?;
    let modules = courses::load_outline(&state.db, id).await?;

    info!(course = %id, author = %caller.id, "Course updated");
    Ok(Json(CourseResponse {
        success: true,
        course: course.to_detail(modules),
    }))
}

/// DELETE /api/courses/:id
pub async fn delete_course(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    caller.require_course_author()?;
    let id = parse_course_id(&id)?;

    if !courses::delete_course(&state.db, id).await? {
        return Err(course_not_found());
    }

    info!(course = %id, author = %caller.id, "Course deleted");
    Ok(Json(json!({
        "success": true,
        "message": "Course deleted successfully",
    })))
}

/// PUT /api/courses/:id/outline
///
/// Replaces the whole outline. Lesson completions recorded against the old
/// outline are discarded with it and enrollment progress is recomputed.
pub async fn replace_outline(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<OutlineRequest>,
) -> ApiResult<Json<CourseResponse>> {
    caller.require_course_author()?;
    let id = parse_course_id(&id)?;

    if courses::find_course(&state.db, id).await?.is_none() {
        return Err(course_not_found());
    }

    let mut tx = begin_write(&state.db).await?;
    courses::replace_outline(&mut *tx, id, &req.modules).await?;
    tx.commit().await?;

    info!(course = %id, modules = req.modules.len(), "Course outline replaced");
    Ok(Json(CourseResponse {
        success: true,
        course: detail_with_outline(&state, id).await?,
    }))
}
