//! Badge unlock scan
//!
//! A badge is granted once a user's cumulative points reach its requirement.
//! The scan is linear over the catalog and never re-awards a held badge.

use std::collections::HashSet;
use uuid::Uuid;

/// Minimal view of a catalog badge needed for the scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeThreshold {
    pub id: Uuid,
    pub requirement: i64,
}

/// Badges from `catalog` that `points` qualifies for and are not in `held`
///
/// Result order follows catalog order.
pub fn newly_unlocked(points: i64, catalog: &[BadgeThreshold], held: &HashSet<Uuid>) -> Vec<Uuid> {
    catalog
        .iter()
        .filter(|badge| badge.requirement <= points && !held.contains(&badge.id))
        .map(|badge| badge.id)
        .collect()
}

/// Default badge catalog inserted into an empty database
///
/// (name, description, requirement)
pub const DEFAULT_BADGES: &[(&str, &str, i64)] = &[
    ("Quick Start", "Earn your first 100 points", 100),
    ("Rising Star", "Reach 500 points", 500),
    ("Point Collector", "Reach 1,000 points", 1000),
    ("Dedicated Learner", "Reach 2,500 points", 2500),
    ("Knowledge Seeker", "Reach 5,000 points", 5000),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<BadgeThreshold> {
        DEFAULT_BADGES
            .iter()
            .map(|(_, _, requirement)| BadgeThreshold {
                id: Uuid::new_v4(),
                requirement: *requirement,
            })
            .collect()
    }

    #[test]
    fn test_no_badges_below_first_threshold() {
        let catalog = catalog();
        assert!(newly_unlocked(99, &catalog, &HashSet::new()).is_empty());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let catalog = catalog();
        let unlocked = newly_unlocked(100, &catalog, &HashSet::new());
        assert_eq!(unlocked, vec![catalog[0].id]);
    }

    #[test]
    fn test_multiple_badges_in_catalog_order() {
        let catalog = catalog();
        let unlocked = newly_unlocked(1200, &catalog, &HashSet::new());
        assert_eq!(unlocked, vec![catalog[0].id, catalog[1].id, catalog[2].id]);
    }

    #[test]
    fn test_held_badges_are_skipped() {
        let catalog = catalog();
        let held: HashSet<Uuid> = [catalog[0].id, catalog[1].id].into_iter().collect();
        let unlocked = newly_unlocked(600, &catalog, &held);
        assert!(unlocked.is_empty());

        let unlocked = newly_unlocked(2500, &catalog, &held);
        assert_eq!(unlocked, vec![catalog[2].id, catalog[3].id]);
    }
}
