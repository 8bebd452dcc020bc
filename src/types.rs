//! Common types used throughout the application

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::levels;

/// Chat-platform user identifier (snowflake)
pub type UserId = u64;

/// A train as reported online by the train-data collaborator, normalized to
/// a canonical shape at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainRecord {
    /// Public run number, as reported upstream
    pub run_number: String,

    /// Train label (service name), "unnamed" when upstream omits it
    pub label: String,

    /// First station of the run
    pub origin: String,

    /// Last station of the run
    pub destination: String,
}

/// An in-progress ride. At most one exists per user at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRide {
    /// Canonical run number the ride was started with
    pub train_number: String,

    /// Moment the ride was started
    pub start_time: DateTime<Utc>,

    /// Origin station, snapshotted at start
    pub origin: String,

    /// Destination station, snapshotted at start
    pub destination: String,

    /// Train label, snapshotted at start
    pub train_label: String,
}

impl ActiveRide {
    /// Elapsed ride duration in minutes, rounded to the nearest minute.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> i64 {
        ((now - self.start_time).num_milliseconds() as f64 / 60_000.0).round() as i64
    }

    /// Human-readable route description.
    pub fn route(&self) -> String {
        format!("{} → {}", self.origin, self.destination)
    }
}

/// A finished ride, immutable once appended to a user's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedRide {
    pub train_number: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub route: String,
    pub train_label: String,
    pub points_awarded: i64,
    pub completion_date: NaiveDate,
}

/// Cumulative per-user counters. Created lazily with zero defaults, mutated
/// only by the ride engine when a ride completes, never evicted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_points: i64,
    pub level_name: String,
    pub streak_count: u32,
    pub last_completion: Option<DateTime<Utc>>,
    pub total_rides: u64,
    pub total_minutes: i64,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            total_points: 0,
            level_name: levels::LEVELS[0].name.to_string(),
            streak_count: 0,
            last_completion: None,
            total_rides: 0,
            total_minutes: 0,
        }
    }
}

/// Result of a successful ride completion, handed back to the caller for
/// messaging.
#[derive(Debug, Clone)]
pub struct RideReceipt {
    /// The ride just appended to history
    pub completed: CompletedRide,

    /// User statistics after the commit
    pub stats: UserStats,
}

/// Commands fed into the event loop by the chat-platform gateway.
#[derive(Debug, Clone)]
pub enum BotCommand {
    /// Open a ride on the given train
    StartRide { user: UserId, train_number: String },

    /// Finish the active ride; the number must match
    EndRide { user: UserId, train_number: String },

    /// Report the user's statistics and recent rides
    Summary { user: UserId },

    /// Report the top drivers, default size from config when `None`
    Leaderboard { top_n: Option<usize> },
}
