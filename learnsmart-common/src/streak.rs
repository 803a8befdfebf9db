//! Daily login streak rule
//!
//! The streak counts consecutive calendar-length days (24h windows) between
//! logins. A gap of more than one day resets it to 1.

use chrono::{DateTime, Utc};

/// Points awarded when a login lands on a new day
pub const DAILY_LOGIN_POINTS: i64 = 5;

/// Result of applying a login to a streak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakUpdate {
    pub streak: i64,
    pub points_awarded: i64,
    pub last_login_at: DateTime<Utc>,
}

/// Apply a login at `now` to the stored streak state
pub fn apply_login(
    current_streak: i64,
    last_login_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> StreakUpdate {
    let Some(last) = last_login_at else {
        return StreakUpdate {
            streak: current_streak.max(1),
            points_awarded: 0,
            last_login_at: now,
        };
    };

    let days = now.signed_duration_since(last).num_days();
    let (streak, points_awarded) = match days {
        1 => (current_streak + 1, DAILY_LOGIN_POINTS),
        d if d > 1 => (1, DAILY_LOGIN_POINTS),
        // same day, or a clock that moved backwards
        _ => (current_streak, 0),
    };

    StreakUpdate {
        streak,
        points_awarded,
        last_login_at: now,
    }
}
