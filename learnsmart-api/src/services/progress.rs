//! Lesson completion, course progress and achievements

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use learnsmart_common::achievements::{
    describe, earned_on_completion, AchievementInfo, CompletionCounts, ACHIEVEMENT_POINTS,
    COURSE_COMPLETION_POINTS, LESSON_POINTS,
};
use learnsmart_common::{Error, Result};

use crate::db::{achievements, begin_write, courses, enrollments};
use crate::services::rewards::{award_points, PointsAward};

/// Result of completing a lesson
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletion {
    pub enrollment_id: Uuid,
    pub lesson_id: Uuid,
    /// False when the lesson had already been completed
    pub newly_completed: bool,
    pub progress: f64,
    pub course_completed: bool,
    pub points_awarded: i64,
    pub achievements: Vec<AchievementInfo>,
    pub reward: PointsAward,
}

/// Percentage of a course's lessons completed; 0 for a course without lessons
pub fn progress_percentage(completed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (completed as f64 / total as f64 * 100.0).min(100.0)
}

/// Mark a lesson complete for an enrolled user
///
/// Repeating a completion changes nothing and awards nothing. All writes
/// happen in one transaction.
pub async fn complete_lesson(
    pool: &SqlitePool,
    user_id: Uuid,
    course_id: Uuid,
    lesson_id: Uuid,
) -> Result<LessonCompletion> {
    let course = courses::find_course(pool, course_id)
        .await?
        .ok_or_else(|| Error::NotFound("Course not found".to_string()))?;

    let mut tx = begin_write(pool).await?;

    let enrollment = enrollments::find_enrollment(&mut *tx, user_id, course_id)
        .await?
        .ok_or_else(|| Error::NotFound("Not enrolled in this course".to_string()))?;

    if !courses::lesson_in_course(&mut *tx, course_id, lesson_id).await? {
        return Err(Error::NotFound("Lesson not found in this course".to_string()));
    }

    let newly_completed = enrollments::record_lesson(&mut *tx, enrollment.id, lesson_id).await?;

    let completed = enrollments::count_completed_lessons(&mut *tx, enrollment.id).await?;
    let total = courses::count_lessons(&mut *tx, course_id).await?;
    let progress = progress_percentage(completed, total);

    let course_completed =
        newly_completed && enrollment.completed_at.is_none() && completed >= total && total > 0;

    let mut points_awarded = 0;
    let mut unlocked = Vec::new();

    if newly_completed {
        points_awarded += LESSON_POINTS;
        enrollments::set_progress(
            &mut *tx,
            enrollment.id,
            progress,
            course_completed.then(Utc::now),
        )
        .await?;
    }

    if course_completed {
        points_awarded += COURSE_COMPLETION_POINTS;
        info!(user = %user_id, course = %course_id, "Course completed");

        let (completed_courses, completed_in_category) =
            enrollments::completion_counts(&mut *tx, user_id, &course.fields.category).await?;
        let counts = CompletionCounts {
            completed_courses,
            completed_in_category,
        };

        for code in earned_on_completion(&course.fields.category, counts) {
            if achievements::unlock(&mut *tx, user_id, code).await? {
                info!(user = %user_id, achievement = code, "Achievement unlocked");
                points_awarded += ACHIEVEMENT_POINTS;
                if let Some(info) = describe(code) {
                    unlocked.push(info);
                }
            }
        }
    }

    let reward = award_points(&mut *tx, user_id, points_awarded).await?;
    tx.commit().await?;

    Ok(LessonCompletion {
        enrollment_id: enrollment.id,
        lesson_id,
        newly_completed,
        progress: if newly_completed { progress } else { enrollment.progress },
        course_completed,
        points_awarded,
        achievements: unlocked,
        reward,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::courses::tests::{fields, outline};
    use crate::db::courses::{insert_course, load_outline, replace_outline};
    use crate::db::enrollments::create_enrollment;
    use crate::db::users::tests::{create_user, test_pool};
    use learnsmart_common::achievements::FIRST_COURSE;

    #[test]
    fn test_progress_percentage() {
        assert_eq!(progress_percentage(0, 0), 0.0);
        assert_eq!(progress_percentage(1, 4), 25.0);
        assert_eq!(progress_percentage(4, 4), 100.0);
        assert_eq!(progress_percentage(5, 4), 100.0);
    }

    async fn course_with_lessons(pool: &SqlitePool, title: &str, category: &str, lessons: usize) -> (Uuid, Vec<Uuid>) {
        let course = insert_course(pool, &fields(title, category)).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        replace_outline(&mut conn, course.id, &outline(lessons)).await.unwrap();
        drop(conn);
        let lesson_ids = load_outline(pool, course.id).await.unwrap()[0]
            .lessons
            .iter()
            .map(|l| l.id)
            .collect();
        (course.id, lesson_ids)
    }

    #[tokio::test]
    async fn test_lesson_then_course_completion() {
        let pool = test_pool().await;
        let user = create_user(&pool, "p@example.com").await;
        let (course_id, lessons) = course_with_lessons(&pool, "Rust Basics", "Backend", 2).await;
        create_enrollment(&pool, user.id, course_id).await.unwrap();

        let first = complete_lesson(&pool, user.id, course_id, lessons[0]).await.unwrap();
        assert!(first.newly_completed);
        assert!(!first.course_completed);
        assert_eq!(first.progress, 50.0);
        assert_eq!(first.points_awarded, LESSON_POINTS);

        let second = complete_lesson(&pool, user.id, course_id, lessons[1]).await.unwrap();
        assert!(second.course_completed);
        assert_eq!(second.progress, 100.0);
        // lesson + completion bonus + FIRST_COURSE
        assert_eq!(second.points_awarded, 10 + 50 + 100);
        assert_eq!(second.achievements.len(), 1);
        assert_eq!(second.achievements[0].code, FIRST_COURSE);
        assert_eq!(second.reward.points, 170);
        assert_eq!(second.reward.new_badges.len(), 1);
    }

    #[tokio::test]
    async fn test_repeat_completion_awards_nothing() {
        let pool = test_pool().await;
        let user = create_user(&pool, "rep@example.com").await;
        let (course_id, lessons) = course_with_lessons(&pool, "Rust Basics", "Backend", 3).await;
        create_enrollment(&pool, user.id, course_id).await.unwrap();

        complete_lesson(&pool, user.id, course_id, lessons[0]).await.unwrap();
        let again = complete_lesson(&pool, user.id, course_id, lessons[0]).await.unwrap();
        assert!(!again.newly_completed);
        assert_eq!(again.points_awarded, 0);
        assert_eq!(again.reward.points, LESSON_POINTS);
    }

    #[tokio::test]
    async fn test_requires_enrollment() {
        let pool = test_pool().await;
        let user = create_user(&pool, "ne@example.com").await;
        let (course_id, lessons) = course_with_lessons(&pool, "Rust Basics", "Backend", 1).await;

        let err = complete_lesson(&pool, user.id, course_id, lessons[0]).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_lesson_from_other_course_rejected() {
        let pool = test_pool().await;
        let user = create_user(&pool, "x@example.com").await;
        let (course_a, _) = course_with_lessons(&pool, "A", "Backend", 1).await;
        let (_, lessons_b) = course_with_lessons(&pool, "B", "Backend", 1).await;
        create_enrollment(&pool, user.id, course_a).await.unwrap();

        let err = complete_lesson(&pool, user.id, course_a, lessons_b[0]).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_category_master_after_three_courses() {
        let pool = test_pool().await;
        let user = create_user(&pool, "m@example.com").await;

        let mut last = None;
        for title in ["One", "Two", "Three"] {
            let (course_id, lessons) = course_with_lessons(&pool, title, "Backend", 1).await;
            create_enrollment(&pool, user.id, course_id).await.unwrap();
            last = Some(complete_lesson(&pool, user.id, course_id, lessons[0]).await.unwrap());
        }

        let last = last.unwrap();
        let codes: Vec<&str> = last.achievements.iter().map(|a| a.code).collect();
        assert_eq!(codes, vec!["BACKEND_MASTER"]);
    }
}
