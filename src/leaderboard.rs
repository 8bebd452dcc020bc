//! Leaderboard View - read-only projections over the ride tracker
//!
//! Never mutates state. Display names come from the chat platform and are
//! resolved best-effort; a failed lookup falls back to a placeholder rather
//! than aborting the projection.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::ride_tracker::RideTracker;
use crate::sinks::{resolve_or_unknown, NameResolver};
use crate::types::{ActiveRide, CompletedRide, UserId, UserStats};

/// One ranked leaderboard row.
#[derive(Debug, Clone)]
pub struct LeaderboardEntry {
    pub user: UserId,
    pub display_name: String,
    pub total_points: i64,
    pub level_name: String,
    pub total_rides: u64,
}

/// Aggregate statistics over every ranked user, not just the shown page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardSummary {
    pub participants: usize,
    pub total_rides: u64,
    pub total_minutes: i64,
}

/// Ranked projection plus its summary.
#[derive(Debug, Clone)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
    pub summary: LeaderboardSummary,
}

/// Per-user report: statistics, averages, recent history and the open ride.
#[derive(Debug, Clone)]
pub struct UserSummary {
    pub display_name: String,
    pub stats: UserStats,
    /// Rounded mean points per ride, 0 with no rides
    pub avg_points: i64,
    /// Rounded mean minutes per ride, 0 with no rides
    pub avg_minutes: i64,
    /// Most recent completed rides, newest first
    pub recent: Vec<CompletedRide>,
    /// The open ride with its running duration, if any
    pub active: Option<(ActiveRide, i64)>,
}

/// Read-only view over the shared tracker.
pub struct LeaderboardView {
    tracker: Arc<RideTracker>,
    names: Arc<dyn NameResolver>,
}

impl LeaderboardView {
    pub fn new(tracker: Arc<RideTracker>, names: Arc<dyn NameResolver>) -> Self {
        Self { tracker, names }
    }

    /// Top drivers by cumulative points.
    ///
    /// Users with zero points are excluded; ties keep a stable order. The
    /// summary covers every ranked user, even those cut by `top_n`.
    pub async fn leaderboard(&self, top_n: usize) -> Leaderboard {
        let mut ranked: Vec<(UserId, UserStats)> = self
            .tracker
            .all_stats()
            .into_iter()
            .filter(|(_, stats)| stats.total_points > 0)
            .collect();
        ranked.sort_by(|a, b| b.1.total_points.cmp(&a.1.total_points));

        let summary = LeaderboardSummary {
            participants: ranked.len(),
            total_rides: ranked.iter().map(|(_, s)| s.total_rides).sum(),
            total_minutes: ranked.iter().map(|(_, s)| s.total_minutes).sum(),
        };

        ranked.truncate(top_n);
        let mut entries = Vec::with_capacity(ranked.len());
        for (user, stats) in ranked {
            entries.push(LeaderboardEntry {
                user,
                display_name: resolve_or_unknown(self.names.as_ref(), user).await,
                total_points: stats.total_points,
                level_name: stats.level_name,
                total_rides: stats.total_rides,
            });
        }

        Leaderboard { entries, summary }
    }

    /// Report for a single user.
    pub async fn user_summary(&self, user: UserId, recent_limit: usize) -> UserSummary {
        self.user_summary_at(user, recent_limit, Utc::now()).await
    }

    /// [`user_summary`](Self::user_summary) with an explicit clock.
    pub async fn user_summary_at(
        &self,
        user: UserId,
        recent_limit: usize,
        now: DateTime<Utc>,
    ) -> UserSummary {
        let stats = self.tracker.stats(user);
        let (avg_points, avg_minutes) = if stats.total_rides > 0 {
            (
                (stats.total_points as f64 / stats.total_rides as f64).round() as i64,
                (stats.total_minutes as f64 / stats.total_rides as f64).round() as i64,
            )
        } else {
            (0, 0)
        };

        UserSummary {
            display_name: resolve_or_unknown(self.names.as_ref(), user).await,
            avg_points,
            avg_minutes,
            recent: self.tracker.recent_rides(user, recent_limit),
            active: self
                .tracker
                .active_ride(user)
                .map(|ride| (ride.clone(), ride.elapsed_minutes(now))),
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;

    use crate::sinks::{StaticNameResolver, UNKNOWN_USER};
    use crate::types::CompletedRide;

    struct FailingResolver;

    #[async_trait]
    impl NameResolver for FailingResolver {
        async fn resolve_display_name(&self, _user: UserId) -> anyhow::Result<String> {
            anyhow::bail!("gateway unavailable")
        }
    }

    fn completed(points: i64, minutes: i64) -> CompletedRide {
        let end = Utc.timestamp_opt(7200, 0).unwrap();
        CompletedRide {
            train_number: "32922".into(),
            start_time: end - chrono::Duration::minutes(minutes),
            end_time: end,
            duration_minutes: minutes,
            route: "Praha → Bohumín".into(),
            train_label: "EC 100".into(),
            points_awarded: points,
            completion_date: end.date_naive(),
        }
    }

    fn seeded_tracker() -> Arc<RideTracker> {
        let tracker = Arc::new(RideTracker::new());
        let now = Utc.timestamp_opt(7200, 0).unwrap();
        // user 1: 38 points, user 2: 120 points over two rides, user 3: none
        tracker.commit_completion(1, completed(38, 65), now, false);
        tracker.commit_completion(2, completed(60, 30), now, false);
        tracker.commit_completion(2, completed(60, 30), now, true);
        tracker.stats(3);
        tracker
    }

    #[tokio::test]
    async fn test_leaderboard_sorted_and_filtered() {
        let view = LeaderboardView::new(seeded_tracker(), Arc::new(StaticNameResolver));
        let board = view.leaderboard(10).await;

        assert_eq!(board.entries.len(), 2);
        assert_eq!(board.entries[0].user, 2);
        assert_eq!(board.entries[0].total_points, 120);
        assert_eq!(board.entries[0].level_name, "Experienced");
        assert_eq!(board.entries[1].user, 1);
        assert_eq!(board.entries[0].display_name, "user-2");
    }

    #[tokio::test]
    async fn test_summary_covers_all_ranked_users_despite_truncation() {
        let view = LeaderboardView::new(seeded_tracker(), Arc::new(StaticNameResolver));
        let board = view.leaderboard(1).await;

        assert_eq!(board.entries.len(), 1);
        assert_eq!(
            board.summary,
            LeaderboardSummary {
                participants: 2,
                total_rides: 3,
                total_minutes: 125,
            }
        );
    }

    #[tokio::test]
    async fn test_name_failure_falls_back_to_placeholder() {
        let view = LeaderboardView::new(seeded_tracker(), Arc::new(FailingResolver));
        let board = view.leaderboard(10).await;

        assert_eq!(board.entries.len(), 2);
        assert!(board.entries.iter().all(|e| e.display_name == UNKNOWN_USER));
    }

    #[tokio::test]
    async fn test_empty_leaderboard() {
        let view = LeaderboardView::new(Arc::new(RideTracker::new()), Arc::new(StaticNameResolver));
        let board = view.leaderboard(10).await;
        assert!(board.entries.is_empty());
        assert_eq!(board.summary.participants, 0);
    }

    #[tokio::test]
    async fn test_user_summary_averages_and_recent() {
        let view = LeaderboardView::new(seeded_tracker(), Arc::new(StaticNameResolver));
        let summary = view.user_summary(2, 5).await;

        assert_eq!(summary.stats.total_points, 120);
        assert_eq!(summary.avg_points, 60);
        assert_eq!(summary.avg_minutes, 30);
        assert_eq!(summary.recent.len(), 2);
        assert!(summary.active.is_none());
    }

    #[tokio::test]
    async fn test_user_summary_includes_running_ride() {
        let tracker = seeded_tracker();
        let start = Utc.timestamp_opt(10_000, 0).unwrap();
        tracker.begin_pending(1, "4603").unwrap();
        tracker.activate(
            1,
            ActiveRide {
                train_number: "4603".into(),
                start_time: start,
                origin: "Katowice".into(),
                destination: "Sosnowiec".into(),
                train_label: "unnamed".into(),
            },
        );

        let view = LeaderboardView::new(tracker, Arc::new(StaticNameResolver));
        let now = start + chrono::Duration::minutes(12);
        let summary = view.user_summary_at(1, 5, now).await;

        let (ride, minutes) = summary.active.unwrap();
        assert_eq!(ride.train_number, "4603");
        assert_eq!(minutes, 12);
    }

    #[tokio::test]
    async fn test_fresh_user_summary_is_zeroed() {
        let view = LeaderboardView::new(Arc::new(RideTracker::new()), Arc::new(StaticNameResolver));
        let summary = view.user_summary(9, 5).await;
        assert_eq!(summary.stats.total_rides, 0);
        assert_eq!(summary.avg_points, 0);
        assert!(summary.recent.is_empty());
    }
}
