//! Point computation for completed rides.
//!
//! A single pure function over ride duration, train label and the two bonus
//! eligibility flags. All inputs are validated by the ride engine before the
//! call, so there are no error conditions here.

/// Point award constants.
pub mod points {
    /// Flat award for any completed ride
    pub const BASE: i64 = 10;

    /// Award per full 5-minute block of ride duration
    pub const PER_FIVE_MIN: i64 = 1;

    /// Extra award for rides at or above [`LONG_RIDE_MINUTES`]
    pub const LONG_RIDE: i64 = 5;

    /// Duration threshold for the long-ride award, in minutes
    pub const LONG_RIDE_MINUTES: i64 = 60;

    /// Extra award for premium train classes (IC/EC/RJ)
    pub const PREMIUM_TRAIN: i64 = 10;

    /// Extra award when the previous completion was under 24 hours ago
    pub const STREAK: i64 = 2;

    /// Extra award for the first completion of a calendar day
    pub const DAILY: i64 = 5;
}

/// Label substrings that mark a premium train class.
///
/// Deliberately a crude case-sensitive substring check, matching the
/// community's established rules. Do not make it smarter.
const PREMIUM_MARKS: [&str; 3] = ["IC", "EC", "RJ"];

/// Compute the points awarded for one completed ride.
///
/// # Arguments
/// * `duration_minutes` - rounded ride duration, >= 1
/// * `train_label` - label snapshotted when the ride started
/// * `is_streak` - previous completion was under 24 hours ago
/// * `is_first_of_day` - no previous completion on today's calendar date
///
/// # Returns
/// Awarded points, always at least [`points::BASE`].
pub fn compute_points(
    duration_minutes: i64,
    train_label: &str,
    is_streak: bool,
    is_first_of_day: bool,
) -> i64 {
    let mut awarded = points::BASE;

    awarded += (duration_minutes / 5) * points::PER_FIVE_MIN;

    if duration_minutes >= points::LONG_RIDE_MINUTES {
        awarded += points::LONG_RIDE;
    }

    if PREMIUM_MARKS.iter().any(|mark| train_label.contains(mark)) {
        awarded += points::PREMIUM_TRAIN;
    }

    if is_streak {
        awarded += points::STREAK;
    }

    if is_first_of_day {
        awarded += points::DAILY;
    }

    awarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base_award() {
        assert_eq!(compute_points(5, "", false, false), 10);
        assert_eq!(compute_points(1, "", false, false), 10);
        assert_eq!(compute_points(4, "", false, false), 10);
    }

    #[test]
    fn test_long_ride_award() {
        // 10 base + 13 five-minute blocks + 5 long ride
        assert_eq!(compute_points(65, "", false, false), 28);
        // Exactly at the threshold: 10 + 12 + 5
        assert_eq!(compute_points(60, "", false, false), 27);
        // Just below: 10 + 11
        assert_eq!(compute_points(59, "", false, false), 21);
    }

    #[test]
    fn test_premium_train_award() {
        // 10 base + 2 blocks + 10 premium
        assert_eq!(compute_points(10, "EC 100", false, false), 22);
        assert_eq!(compute_points(10, "IC Ostravan", false, false), 22);
        assert_eq!(compute_points(10, "RJ 71", false, false), 22);
        // Case-sensitive on purpose
        assert_eq!(compute_points(10, "ec 100", false, false), 12);
        assert_eq!(compute_points(10, "Os 3301", false, false), 12);
    }

    #[test]
    fn test_streak_and_daily_awards_are_additive() {
        // 10 base + 6 blocks + 2 streak + 5 daily
        assert_eq!(compute_points(30, "", true, true), 23);
        assert_eq!(compute_points(30, "", true, false), 18);
        assert_eq!(compute_points(30, "", false, true), 21);
    }

    #[test]
    fn test_all_awards_combine() {
        // 10 + 13 + 5 + 10 + 2 + 5
        assert_eq!(compute_points(65, "EC Fastlane", true, true), 45);
    }

    proptest! {
        #[test]
        fn points_never_below_base(
            duration in 1i64..10_000,
            streak: bool,
            daily: bool,
        ) {
            prop_assert!(compute_points(duration, "Os 1234", streak, daily) >= points::BASE);
        }

        #[test]
        fn points_monotone_in_duration(duration in 1i64..9_999) {
            let shorter = compute_points(duration, "", false, false);
            let longer = compute_points(duration + 1, "", false, false);
            prop_assert!(longer >= shorter);
        }
    }
}
