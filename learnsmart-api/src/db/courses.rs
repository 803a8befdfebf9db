//! Course catalog and course outlines

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

use learnsmart_common::course::{
    Course, CourseFields, CourseModule, Lesson, LessonResource, ModuleDraft, ResourceKind,
};
use learnsmart_common::{Error, Result};

use super::parse_id;

const COURSE_COLUMNS: &str = "id, title, url, short_intro, category, sub_category, course_type, \
    language, subtitle_languages, skills, instructors, rating, viewers, duration, site, \
    created_at, updated_at";

/// Listing filters
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    /// Exact category match (case-insensitive)
    pub category: Option<String>,
    /// Substring of title, intro or skills (case-insensitive)
    pub query: Option<String>,
}

fn course_from_row(row: &SqliteRow) -> Result<Course> {
    let id: String = row.try_get("id")?;
    Ok(Course {
        id: parse_id(&id)?,
        fields: CourseFields {
            title: row.try_get("title")?,
            url: row.try_get("url")?,
            short_intro: row.try_get("short_intro")?,
            category: row.try_get("category")?,
            sub_category: row.try_get("sub_category")?,
            course_type: row.try_get("course_type")?,
            language: row.try_get("language")?,
            subtitle_languages: row.try_get("subtitle_languages")?,
            skills: row.try_get("skills")?,
            instructors: row.try_get("instructors")?,
            rating: row.try_get("rating")?,
            viewers: row.try_get("viewers")?,
            duration: row.try_get("duration")?,
            site: row.try_get("site")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Shared WHERE clause for listing and counting
///
/// Both parameters are bound twice (`? IS NULL OR ...`).
const FILTER_CLAUSE: &str = r#"
    WHERE (?1 IS NULL OR lower(category) = lower(?1))
      AND (?2 IS NULL
           OR instr(lower(title), lower(?2)) > 0
           OR instr(lower(short_intro), lower(?2)) > 0
           OR instr(lower(skills), lower(?2)) > 0)
"#;

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub async fn count_courses(pool: &SqlitePool, filter: &CourseFilter) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM courses {}", FILTER_CLAUSE);
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(non_blank(&filter.category))
        .bind(non_blank(&filter.query))
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// One page of courses, newest first
pub async fn list_courses(
    pool: &SqlitePool,
    filter: &CourseFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Course>> {
    let sql = format!(
        "SELECT {} FROM courses {} ORDER BY created_at DESC, id ASC LIMIT ?3 OFFSET ?4",
        COURSE_COLUMNS, FILTER_CLAUSE
    );
    let rows = sqlx::query(&sql)
        .bind(non_blank(&filter.category))
        .bind(non_blank(&filter.query))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    rows.iter().map(course_from_row).collect()
}

/// Every course, oldest first (used to brief the recommender)
pub async fn all_courses(pool: &SqlitePool) -> Result<Vec<Course>> {
    let sql = format!("SELECT {} FROM courses ORDER BY created_at ASC", COURSE_COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(course_from_row).collect()
}

pub async fn find_course(pool: &SqlitePool, id: Uuid) -> Result<Option<Course>> {
    let sql = format!("SELECT {} FROM courses WHERE id = ?", COURSE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(course_from_row).transpose()
}

pub async fn insert_course(pool: &SqlitePool, fields: &CourseFields) -> Result<Course> {
    fields.validate()?;

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO courses (
            id, title, url, short_intro, category, sub_category, course_type, language,
            subtitle_languages, skills, instructors, rating, viewers, duration, site,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&fields.title)
    .bind(&fields.url)
    .bind(&fields.short_intro)
    .bind(&fields.category)
    .bind(&fields.sub_category)
    .bind(&fields.course_type)
    .bind(&fields.language)
    .bind(&fields.subtitle_languages)
    .bind(&fields.skills)
    .bind(&fields.instructors)
    .bind(&fields.rating)
    .bind(&fields.viewers)
    .bind(&fields.duration)
    .bind(&fields.site)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Course {
        id,
        fields: fields.clone(),
        created_at: now,
        updated_at: now,
    })
}

/// Overwrite every column of an existing course
pub async fn update_course(pool: &SqlitePool, course: &Course) -> Result<Course> {
    course.fields.validate()?;
    let now = Utc::now();
    let fields = &course.fields;

    let result = sqlx::query(
        r#"
        UPDATE courses SET
            title = ?, url = ?, short_intro = ?, category = ?, sub_category = ?,
            course_type = ?, language = ?, subtitle_languages = ?, skills = ?,
            instructors = ?, rating = ?, viewers = ?, duration = ?, site = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.title)
    .bind(&fields.url)
    .bind(&fields.short_intro)
    .bind(&fields.category)
    .bind(&fields.sub_category)
    .bind(&fields.course_type)
    .bind(&fields.language)
    .bind(&fields.subtitle_languages)
    .bind(&fields.skills)
    .bind(&fields.instructors)
    .bind(&fields.rating)
    .bind(&fields.viewers)
    .bind(&fields.duration)
    .bind(&fields.site)
    .bind(now)
    .bind(course.id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Course not found".to_string()));
    }

    Ok(Course {
        updated_at: now,
        ..course.clone()
    })
}

/// Delete a course (outline and enrollments cascade); false if absent
pub async fn delete_course(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Load a course's outline ordered by position at every level
pub async fn load_outline(pool: &SqlitePool, course_id: Uuid) -> Result<Vec<CourseModule>> {
    let module_rows = sqlx::query(
        "SELECT id, title, duration, position FROM course_modules WHERE course_id = ? ORDER BY position ASC",
    )
    .bind(course_id.to_string())
    .fetch_all(pool)
    .await?;

    if module_rows.is_empty() {
        return Ok(Vec::new());
    }

    let lesson_rows = sqlx::query(
        r#"
        SELECT l.id, l.module_id, l.title, l.duration, l.video_url, l.position
        FROM lessons l
        JOIN course_modules m ON m.id = l.module_id
        WHERE m.course_id = ?
        ORDER BY l.position ASC
        "#,
    )
    .bind(course_id.to_string())
    .fetch_all(pool)
    .await?;

    let resource_rows = sqlx::query(
        r#"
        SELECT r.id, r.lesson_id, r.title, r.kind, r.url
        FROM lesson_resources r
        JOIN lessons l ON l.id = r.lesson_id
        JOIN course_modules m ON m.id = l.module_id
        WHERE m.course_id = ?
        ORDER BY r.position ASC
        "#,
    )
    .bind(course_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut resources: HashMap<String, Vec<LessonResource>> = HashMap::new();
    for row in &resource_rows {
        let lesson_id: String = row.try_get("lesson_id")?;
        let id: String = row.try_get("id")?;
        let kind: String = row.try_get("kind")?;
        let kind = ResourceKind::parse(&kind)
            .ok_or_else(|| Error::Internal(format!("Unknown resource kind '{}'", kind)))?;
        resources.entry(lesson_id).or_default().push(LessonResource {
            id: parse_id(&id)?,
            title: row.try_get("title")?,
            kind,
            url: row.try_get("url")?,
        });
    }

    let mut lessons: HashMap<String, Vec<Lesson>> = HashMap::new();
    for row in &lesson_rows {
        let module_id: String = row.try_get("module_id")?;
        let id: String = row.try_get("id")?;
        let lesson = Lesson {
            id: parse_id(&id)?,
            title: row.try_get("title")?,
            duration: row.try_get("duration")?,
            video_url: row.try_get("video_url")?,
            order: row.try_get("position")?,
            resources: resources.remove(&id).unwrap_or_default(),
        };
        lessons.entry(module_id).or_default().push(lesson);
    }

    module_rows
        .iter()
        .map(|row| {
            let id: String = row.try_get("id")?;
            Ok(CourseModule {
                id: parse_id(&id)?,
                title: row.try_get("title")?,
                duration: row.try_get("duration")?,
                order: row.try_get("position")?,
                lessons: lessons.remove(&id).unwrap_or_default(),
            })
        })
        .collect()
}

/// Replace a course's outline with `drafts`
///
/// Existing modules, lessons, resources and lesson completions for the
/// course are removed and enrollment progress is recomputed. Runs on the
/// caller's transaction.
pub async fn replace_outline(
    conn: &mut SqliteConnection,
    course_id: Uuid,
    drafts: &[ModuleDraft],
) -> Result<()> {
    for module in drafts {
        if module.title.trim().is_empty() {
            return Err(Error::InvalidInput("Module title is required".to_string()));
        }
        for lesson in &module.lessons {
            if lesson.title.trim().is_empty() {
                return Err(Error::InvalidInput("Lesson title is required".to_string()));
            }
            if lesson.resources.iter().any(|r| r.url.trim().is_empty()) {
                return Err(Error::InvalidInput("Resource url is required".to_string()));
            }
        }
    }

    sqlx::query("DELETE FROM course_modules WHERE course_id = ?")
        .bind(course_id.to_string())
        .execute(&mut *conn)
        .await?;

    for module in drafts {
        let module_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO course_modules (id, course_id, title, duration, position) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(module_id.to_string())
        .bind(course_id.to_string())
        .bind(module.title.trim())
        .bind(&module.duration)
        .bind(module.order)
        .execute(&mut *conn)
        .await?;

        for lesson in &module.lessons {
            let lesson_id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO lessons (id, module_id, title, duration, video_url, position) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(lesson_id.to_string())
            .bind(module_id.to_string())
            .bind(lesson.title.trim())
            .bind(&lesson.duration)
            .bind(&lesson.video_url)
            .bind(lesson.order)
            .execute(&mut *conn)
            .await?;

            for (position, resource) in lesson.resources.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO lesson_resources (id, lesson_id, title, kind, url, position) VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(Uuid::new_v4().to_string())
                .bind(lesson_id.to_string())
                .bind(&resource.title)
                .bind(resource.kind.as_str())
                .bind(&resource.url)
                .bind(position as i64)
                .execute(&mut *conn)
                .await?;
            }
        }
    }

    super::enrollments::recompute_course_progress(&mut *conn, course_id).await?;

    Ok(())
}

/// Total lessons across every module of a course
pub async fn count_lessons(conn: &mut SqliteConnection, course_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM lessons l
        JOIN course_modules m ON m.id = l.module_id
        WHERE m.course_id = ?
        "#,
    )
    .bind(course_id.to_string())
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

/// True when `lesson_id` belongs to a module of `course_id`
pub async fn lesson_in_course(
    conn: &mut SqliteConnection,
    course_id: Uuid,
    lesson_id: Uuid,
) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT 1 FROM lessons l
        JOIN course_modules m ON m.id = l.module_id
        WHERE m.course_id = ? AND l.id = ?
        "#,
    )
    .bind(course_id.to_string())
    .bind(lesson_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(found.is_some())
}
