//! Leveling curve
//!
//! Level costs grow geometrically: level 1 costs [`BASE_LEVEL_COST`] points and
//! every following level costs the previous cost multiplied by 1.8, floored.
//! The multiplication is done as `cost * 9 / 5` so the curve is exact integer
//! arithmetic.
//!
//! A point total sits in the level whose cumulative range contains it:
//!
//! | level | cost | reached at |
//! |-------|------|------------|
//! | 1     | 1000 | 0          |
//! | 2     | 1800 | 1000       |
//! | 3     | 3240 | 2800       |
//! | 4     | 5832 | 6040       |

use serde::{Deserialize, Serialize};

/// Points required to complete level 1
pub const BASE_LEVEL_COST: u64 = 1000;

const PERCENT_CEILING: f64 = 99.999;

/// Cost of the level following one that costs `cost`
///
/// Equivalent to `floor(cost * 1.8)`.
pub fn next_level_cost(cost: u64) -> u64 {
    cost.saturating_mul(9) / 5
}

/// Progress through the current level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    /// Points earned beyond the start of the current level
    pub current: u64,
    /// Cost of the current level
    pub next_level: u64,
    /// `current / next_level * 100`, always in `[0, 100)`
    pub percentage: f64,
}

/// Position of a point total on the curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CurvePosition {
    level: u32,
    accumulated: u64,
    cost: u64,
}

fn locate(points: u64) -> CurvePosition {
    let mut position = CurvePosition {
        level: 1,
        accumulated: 0,
        cost: BASE_LEVEL_COST,
    };

    // checked_add: totals near u64::MAX stop at the last representable level
    while let Some(next_start) = position.accumulated.checked_add(position.cost) {
        if points < next_start {
            break;
        }
        position.accumulated = next_start;
        position.level += 1;
        position.cost = next_level_cost(position.cost);
    }

    position
}

/// Level for a point total (1-based)
///
/// # Examples
/// ```
/// use learnsmart_common::leveling::level_for_points;
///
/// assert_eq!(level_for_points(0), 1);
/// assert_eq!(level_for_points(999), 1);
/// assert_eq!(level_for_points(1000), 2);
/// assert_eq!(level_for_points(2800), 3);
/// ```
pub fn level_for_points(points: u64) -> u32 {
    locate(points).level
}

/// Progress within the current level for a point total
///
/// # Examples
/// ```
/// use learnsmart_common::leveling::level_progress;
///
/// let p = level_progress(1900);
/// assert_eq!(p.current, 900);
/// assert_eq!(p.next_level, 1800);
/// assert_eq!(p.percentage, 50.0);
/// ```
pub fn level_progress(points: u64) -> LevelProgress {
    let position = locate(points);
    let current = points - position.accumulated;
    let raw = current as f64 / position.cost as f64 * 100.0;
    // f64 rounding (and saturated accumulation) can land exactly on 100
    let percentage = if raw < 100.0 { raw } else { PERCENT_CEILING };

    LevelProgress {
        current,
        next_level: position.cost,
        percentage,
    }
}

/// Points at which `level` starts
pub fn points_for_level(level: u32) -> u64 {
    let mut accumulated: u64 = 0;
    let mut cost = BASE_LEVEL_COST;
    for _ in 1..level.max(1) {
        accumulated = accumulated.saturating_add(cost);
        cost = next_level_cost(cost);
    }
    accumulated
}

/// Clamp a stored (signed) point column to the curve's domain
pub fn clamp_points(points: i64) -> u64 {
    points.max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_level_cost_sequence() {
        let mut cost = BASE_LEVEL_COST;
        let mut costs = vec![cost];
        for _ in 0..4 {
            cost = next_level_cost(cost);
            costs.push(cost);
        }
        // 10497.6 and 18894.6 floor to integers
        assert_eq!(costs, vec![1000, 1800, 3240, 5832, 10497]);
        assert_eq!(next_level_cost(10497), 18894);
    }

    #[test]
    fn test_level_boundaries() {
        assert_eq!(level_for_points(0), 1);
        assert_eq!(level_for_points(999), 1);
        assert_eq!(level_for_points(1000), 2);
        assert_eq!(level_for_points(2799), 2);
        assert_eq!(level_for_points(2800), 3);
        assert_eq!(level_for_points(6039), 3);
        assert_eq!(level_for_points(6040), 4);
    }

    #[test]
    fn test_points_for_level_matches_boundaries() {
        assert_eq!(points_for_level(0), 0);
        assert_eq!(points_for_level(1), 0);
        assert_eq!(points_for_level(2), 1000);
        assert_eq!(points_for_level(3), 2800);
        assert_eq!(points_for_level(4), 6040);
        for level in 1..20 {
            assert_eq!(level_for_points(points_for_level(level)), level);
        }
    }

    #[test]
    fn test_progress_at_level_start_is_zero() {
        let p = level_progress(1000);
        assert_eq!(p.current, 0);
        assert_eq!(p.next_level, 1800);
        assert_eq!(p.percentage, 0.0);
    }

    #[test]
    fn test_progress_mid_level_one() {
        let p = level_progress(250);
        assert_eq!(p.current, 250);
        assert_eq!(p.next_level, 1000);
        assert_eq!(p.percentage, 25.0);
    }

    #[test]
    fn test_huge_totals_do_not_overflow() {
        let level = level_for_points(u64::MAX);
        assert!(level > 50);
        let p = level_progress(u64::MAX);
        assert!(p.percentage >= 0.0 && p.percentage < 100.0);
    }

    #[test]
    fn test_clamp_points() {
        assert_eq!(clamp_points(-5), 0);
        assert_eq!(clamp_points(0), 0);
        assert_eq!(clamp_points(42), 42);
    }

    #[test]
    fn test_progress_serializes_camel_case() {
        let json = serde_json::to_value(level_progress(1900)).unwrap();
        assert_eq!(json["current"], 900);
        assert_eq!(json["nextLevel"], 1800);
        assert_eq!(json["percentage"], 50.0);
    }

    proptest! {
        #[test]
        fn prop_level_is_monotonic(a in 0u64..10_000_000_000, b in 0u64..10_000_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(level_for_points(lo) <= level_for_points(hi));
        }

        #[test]
        fn prop_percentage_in_range(points in any::<u64>()) {
            let p = level_progress(points);
            prop_assert!(p.percentage >= 0.0);
            prop_assert!(p.percentage < 100.0);
        }

        #[test]
        fn prop_current_below_level_cost(points in 0u64..10_000_000_000) {
            let p = level_progress(points);
            prop_assert!(p.current < p.next_level);
            prop_assert_eq!(points - p.current, points_for_level(level_for_points(points)));
        }
    }
}
