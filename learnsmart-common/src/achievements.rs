//! Course-completion achievements
//!
//! Achievements are one-time milestones evaluated whenever an enrollment
//! reaches 100% progress. Each newly unlocked achievement is worth
//! [`ACHIEVEMENT_POINTS`].

use serde::Serialize;

/// Points awarded for each lesson completed for the first time
pub const LESSON_POINTS: i64 = 10;
/// Bonus points when a course reaches 100% progress
pub const COURSE_COMPLETION_POINTS: i64 = 50;
/// Points awarded per unlocked achievement
pub const ACHIEVEMENT_POINTS: i64 = 100;

pub const FIRST_COURSE: &str = "FIRST_COURSE";
pub const COURSE_MASTER: &str = "COURSE_MASTER";

const COURSE_MASTER_COUNT: i64 = 5;
const CATEGORY_MASTER_COUNT: i64 = 3;

/// Category → achievement code
const CATEGORY_ACHIEVEMENTS: &[(&str, &str)] = &[
    ("Web Development", "WEB_MASTER"),
    ("Frontend", "FRONTEND_MASTER"),
    ("Backend", "BACKEND_MASTER"),
    ("Mobile", "MOBILE_MASTER"),
    ("DevOps", "DEVOPS_MASTER"),
];

/// Display information for an achievement code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AchievementInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

const CATALOG: &[AchievementInfo] = &[
    AchievementInfo { code: FIRST_COURSE, name: "First Steps", description: "Complete your first course" },
    AchievementInfo { code: COURSE_MASTER, name: "Course Master", description: "Complete 5 courses" },
    AchievementInfo { code: "WEB_MASTER", name: "Web Master", description: "Complete 3 Web Development courses" },
    AchievementInfo { code: "FRONTEND_MASTER", name: "Frontend Master", description: "Complete 3 Frontend courses" },
    AchievementInfo { code: "BACKEND_MASTER", name: "Backend Master", description: "Complete 3 Backend courses" },
    AchievementInfo { code: "MOBILE_MASTER", name: "Mobile Master", description: "Complete 3 Mobile courses" },
    AchievementInfo { code: "DEVOPS_MASTER", name: "DevOps Master", description: "Complete 3 DevOps courses" },
];

/// Look up display information for a stored achievement code
pub fn describe(code: &str) -> Option<AchievementInfo> {
    CATALOG.iter().copied().find(|a| a.code == code)
}

/// Achievement code for completing courses in `category`, if one exists
///
/// Matching ignores case and surrounding whitespace.
pub fn category_achievement(category: &str) -> Option<&'static str> {
    let category = category.trim();
    CATEGORY_ACHIEVEMENTS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|(_, code)| *code)
}

/// Counts observed right after a course was completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionCounts {
    /// Courses the user has completed, including this one
    pub completed_courses: i64,
    /// Completed courses sharing this course's category, including this one
    pub completed_in_category: i64,
}

/// Achievement codes earned by a course completion
///
/// Milestones fire on the exact count so each is evaluated once; callers
/// still skip codes the user already holds.
pub fn earned_on_completion(category: &str, counts: CompletionCounts) -> Vec<&'static str> {
    let mut earned = Vec::new();

    if counts.completed_courses == 1 {
        earned.push(FIRST_COURSE);
    }
    if counts.completed_courses == COURSE_MASTER_COUNT {
        earned.push(COURSE_MASTER);
    }
    if counts.completed_in_category == CATEGORY_MASTER_COUNT {
        if let Some(code) = category_achievement(category) {
            earned.push(code);
        }
    }

    earned
}
