//! Static level table mapping cumulative points to named tiers.
//!
//! The table is ordered, contiguous and non-overlapping. The top tier is
//! unbounded above its minimum, so every non-negative score resolves to
//! exactly one level.

/// A named tier with an inclusive point range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    /// Display name of the tier
    pub name: &'static str,

    /// Minimum cumulative points (inclusive)
    pub min: i64,

    /// Maximum cumulative points (inclusive; `i64::MAX` for the top tier)
    pub max: i64,
}

/// Level thresholds, ascending.
pub const LEVELS: [Level; 4] = [
    Level { name: "Beginner", min: 0, max: 99 },
    Level { name: "Experienced", min: 100, max: 299 },
    Level { name: "Expert", min: 300, max: 599 },
    Level { name: "Master", min: 600, max: i64::MAX },
];

/// Resolve the level for a cumulative score.
///
/// Ascending scan, first matching range wins. Scores above every range
/// (impossible with the open-ended top tier, but kept total regardless)
/// resolve to the top tier.
pub fn level_for(points: i64) -> &'static Level {
    LEVELS
        .iter()
        .find(|level| points >= level.min && points <= level.max)
        .unwrap_or(&LEVELS[LEVELS.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(level_for(0).name, "Beginner");
        assert_eq!(level_for(99).name, "Beginner");
        assert_eq!(level_for(100).name, "Experienced");
        assert_eq!(level_for(299).name, "Experienced");
        assert_eq!(level_for(300).name, "Expert");
        assert_eq!(level_for(599).name, "Expert");
        assert_eq!(level_for(600).name, "Master");
    }

    #[test]
    fn test_top_tier_is_unbounded() {
        assert_eq!(level_for(9999).name, "Master");
        assert_eq!(level_for(1_000_000).name, "Master");
        assert_eq!(level_for(i64::MAX).name, "Master");
    }

    #[test]
    fn test_lookup_is_total_with_no_overlaps() {
        // Each score in a dense range must match exactly one table entry.
        for score in 0..2_000i64 {
            let matches = LEVELS
                .iter()
                .filter(|l| score >= l.min && score <= l.max)
                .count();
            assert_eq!(matches, 1, "score {} matched {} levels", score, matches);
        }
    }

    #[test]
    fn test_ranges_are_contiguous() {
        for pair in LEVELS.windows(2) {
            assert_eq!(pair[0].max + 1, pair[1].min);
        }
    }
}
