//! Enrollments and lesson completion records

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use learnsmart_common::{Error, Result};

use super::parse_id;

#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub progress: f64,
    pub completed_lessons: Vec<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const ENROLLMENT_COLUMNS: &str =
    "id, user_id, course_id, progress, completed_at, created_at, updated_at";

async fn enrollment_from_row(conn: &mut SqliteConnection, row: &SqliteRow) -> Result<Enrollment> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let course_id: String = row.try_get("course_id")?;

    let lesson_ids: Vec<String> = sqlx::query_scalar(
        "SELECT lesson_id FROM completed_lessons WHERE enrollment_id = ? ORDER BY completed_at ASC",
    )
    .bind(&id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Enrollment {
        id: parse_id(&id)?,
        user_id: parse_id(&user_id)?,
        course_id: parse_id(&course_id)?,
        progress: row.try_get("progress")?,
        completed_lessons: lesson_ids
            .iter()
            .map(|l| parse_id(l))
            .collect::<Result<Vec<_>>>()?,
        completed_at: row.try_get("completed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Enroll a user; a second enrollment in the same course is a conflict
pub async fn create_enrollment(pool: &SqlitePool, user_id: Uuid, course_id: Uuid) -> Result<Enrollment> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO enrollments (id, user_id, course_id, progress, created_at, updated_at)
        VALUES (?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(course_id.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(Enrollment {
            id,
            user_id,
            course_id,
            progress: 0.0,
            completed_lessons: Vec::new(),
            completed_at: None,
            created_at: now,
            updated_at: now,
        }),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            Error::Conflict("Already enrolled in this course".to_string()),
        ),
        Err(e) => Err(e.into()),
    }
}

/// A user's enrollments, most recent first
pub async fn list_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Enrollment>> {
    let mut conn = pool.acquire().await?;
    let sql = format!(
        "SELECT {} FROM enrollments WHERE user_id = ? ORDER BY created_at DESC",
        ENROLLMENT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(user_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    let mut enrollments = Vec::with_capacity(rows.len());
    for row in &rows {
        enrollments.push(enrollment_from_row(&mut conn, row).await?);
    }
    Ok(enrollments)
}

pub async fn find_enrollment(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    course_id: Uuid,
) -> Result<Option<Enrollment>> {
    let sql = format!(
        "SELECT {} FROM enrollments WHERE user_id = ? AND course_id = ?",
        ENROLLMENT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(user_id.to_string())
        .bind(course_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(Some(enrollment_from_row(conn, &row).await?)),
        None => Ok(None),
    }
}

/// Record a completed lesson; returns false if it was already recorded
pub async fn record_lesson(
    conn: &mut SqliteConnection,
    enrollment_id: Uuid,
    lesson_id: Uuid,
) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO completed_lessons (enrollment_id, lesson_id, completed_at) VALUES (?, ?, ?)",
    )
    .bind(enrollment_id.to_string())
    .bind(lesson_id.to_string())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_completed_lessons(conn: &mut SqliteConnection, enrollment_id: Uuid) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM completed_lessons WHERE enrollment_id = ?")
            .bind(enrollment_id.to_string())
            .fetch_one(&mut *conn)
            .await?;

    Ok(count)
}

/// Store progress; `completed_at` is only ever set once
pub async fn set_progress(
    conn: &mut SqliteConnection,
    enrollment_id: Uuid,
    progress: f64,
    completed_at: Option<DateTime<Utc>>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE enrollments
        SET progress = ?, completed_at = COALESCE(completed_at, ?), updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(progress.clamp(0.0, 100.0))
    .bind(completed_at)
    .bind(Utc::now())
    .bind(enrollment_id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Recompute progress for every enrollment in a course from its recorded
/// completions; used after the course outline changes
///
/// `completed_at` is left alone, so a finished course stays finished.
pub async fn recompute_course_progress(conn: &mut SqliteConnection, course_id: Uuid) -> Result<u64> {
    let total = super::courses::count_lessons(&mut *conn, course_id).await?;

    let result = sqlx::query(
        r#"
        UPDATE enrollments
        SET progress = CASE
                WHEN ?2 > 0 THEN MIN(100.0,
                    (SELECT COUNT(*) FROM completed_lessons cl WHERE cl.enrollment_id = enrollments.id)
                    * 100.0 / ?2)
                ELSE 0
            END,
            updated_at = ?3
        WHERE course_id = ?1
        "#,
    )
    .bind(course_id.to_string())
    .bind(total)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Completed courses for a user, overall and within `category`
pub async fn completion_counts(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    category: &str,
) -> Result<(i64, i64)> {
    let (total, in_category): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COALESCE(SUM(CASE WHEN lower(c.category) = lower(?) THEN 1 ELSE 0 END), 0)
        FROM enrollments e
        JOIN courses c ON c.id = e.course_id
        WHERE e.user_id = ? AND e.completed_at IS NOT NULL
        "#,
    )
    .bind(category.trim())
    .bind(user_id.to_string())
    .fetch_one(&mut *conn)
    .await?;

    Ok((total, in_category))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::courses::tests::fields;
    use crate::db::courses::insert_course;
    use crate::db::users::tests::{create_user, test_pool};

    #[tokio::test]
    async fn test_duplicate_enrollment_conflicts() {
        let pool = test_pool().await;
        let user = create_user(&pool, "e@example.com").await;
        let course = insert_course(&pool, &fields("Rust Basics", "Backend")).await.unwrap();

        create_enrollment(&pool, user.id, course.id).await.unwrap();
        let err = create_enrollment(&pool, user.id, course.id).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_enrollment_for_unknown_course_fails() {
        let pool = test_pool().await;
        let user = create_user(&pool, "e@example.com").await;
        assert!(create_enrollment(&pool, user.id, Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn test_completion_counts_by_category() {
        let pool = test_pool().await;
        let user = create_user(&pool, "c@example.com").await;
        let a = insert_course(&pool, &fields("A", "Backend")).await.unwrap();
        let b = insert_course(&pool, &fields("B", "Frontend")).await.unwrap();
        let c = insert_course(&pool, &fields("C", "Backend")).await.unwrap();

        let mut ids = Vec::new();
        for course in [&a, &b, &c] {
            ids.push(create_enrollment(&pool, user.id, course.id).await.unwrap().id);
        }

        let mut conn = pool.acquire().await.unwrap();
        set_progress(&mut conn, ids[0], 100.0, Some(Utc::now())).await.unwrap();
        set_progress(&mut conn, ids[1], 100.0, Some(Utc::now())).await.unwrap();
        set_progress(&mut conn, ids[2], 40.0, None).await.unwrap();

        let (total, backend) = completion_counts(&mut conn, user.id, "backend").await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(backend, 1);
    }

    #[tokio::test]
    async fn test_list_includes_completed_lessons() {
        let pool = test_pool().await;
        let user = create_user(&pool, "l@example.com").await;
        let course = insert_course(&pool, &fields("Rust Basics", "Backend")).await.unwrap();
        let enrollment = create_enrollment(&pool, user.id, course.id).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        crate::db::courses::replace_outline(&mut conn, course.id, &crate::db::courses::tests::outline(2))
            .await
            .unwrap();
        drop(conn);
        let lesson_id = crate::db::courses::load_outline(&pool, course.id).await.unwrap()[0].lessons[0].id;

        let mut conn = pool.acquire().await.unwrap();
        assert!(record_lesson(&mut conn, enrollment.id, lesson_id).await.unwrap());
        assert!(!record_lesson(&mut conn, enrollment.id, lesson_id).await.unwrap());
        assert_eq!(count_completed_lessons(&mut conn, enrollment.id).await.unwrap(), 1);
        drop(conn);

        let listed = list_for_user(&pool, user.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].completed_lessons, vec![lesson_id]);
    }

    #[tokio::test]
    async fn test_new_outline_discards_completions_and_progress() {
        let pool = test_pool().await;
        let user = create_user(&pool, "o@example.com").await;
        let course = insert_course(&pool, &fields("Rust Basics", "Backend")).await.unwrap();
        let enrollment = create_enrollment(&pool, user.id, course.id).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        crate::db::courses::replace_outline(&mut conn, course.id, &crate::db::courses::tests::outline(2))
            .await
            .unwrap();
        drop(conn);
        let lesson_id = crate::db::courses::load_outline(&pool, course.id).await.unwrap()[0].lessons[0].id;

        let mut conn = pool.acquire().await.unwrap();
        record_lesson(&mut conn, enrollment.id, lesson_id).await.unwrap();
        set_progress(&mut conn, enrollment.id, 50.0, None).await.unwrap();

        crate::db::courses::replace_outline(&mut conn, course.id, &crate::db::courses::tests::outline(4))
            .await
            .unwrap();
        assert_eq!(count_completed_lessons(&mut conn, enrollment.id).await.unwrap(), 0);
        drop(conn);

        let listed = list_for_user(&pool, user.id).await.unwrap();
        assert!(listed[0].completed_lessons.is_empty());
        assert_eq!(listed[0].progress, 0.0);
    }

    #[tokio::test]
    async fn test_recompute_keeps_surviving_completions() {
        let pool = test_pool().await;
        let user = create_user(&pool, "r@example.com").await;
        let course = insert_course(&pool, &fields("Rust Basics", "Backend")).await.unwrap();
        let enrollment = create_enrollment(&pool, user.id, course.id).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        crate::db::courses::replace_outline(&mut conn, course.id, &crate::db::courses::tests::outline(4))
            .await
            .unwrap();
        drop(conn);
        let lesson_id = crate::db::courses::load_outline(&pool, course.id).await.unwrap()[0].lessons[0].id;

        let mut conn = pool.acquire().await.unwrap();
        record_lesson(&mut conn, enrollment.id, lesson_id).await.unwrap();
        assert_eq!(recompute_course_progress(&mut conn, course.id).await.unwrap(), 1);
        drop(conn);

        let listed = list_for_user(&pool, user.id).await.unwrap();
        assert_eq!(listed[0].progress, 25.0);
    }
}
