//! Ride Tracker Module - per-user ride ledger and statistics store
//!
//! This module owns all mutable ride state: the at-most-one open slot per
//! user, the append-only completed-ride history, and the cumulative
//! statistics. It is shared via `Arc` between the ride engine (the only
//! writer) and the read-only leaderboard view.
//!
//! ## Key Features
//!
//! - **Lock-free concurrent access**: Uses DashMap for zero-contention reads
//! - **Pending slot reservation**: Reserves a user's slot before the external
//!   train fetch is awaited, so two overlapping start requests cannot both
//!   pass the single-active-ride check
//! - **Transactional completion**: Statistics, history append and slot
//!   removal happen in one synchronous commit

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use chrono::{DateTime, Utc};

use crate::errors::RideError;
use crate::levels;
use crate::types::{ActiveRide, CompletedRide, UserId, UserStats};

/// The open slot for one user.
///
/// `Pending` reserves the slot while the external train lookup is in flight;
/// it carries the requested number so a conflicting start can name it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RideSlot {
    Pending { train_number: String },
    Active(ActiveRide),
}

impl RideSlot {
    /// Run number associated with the slot, whatever its state.
    pub fn train_number(&self) -> &str {
        match self {
            Self::Pending { train_number } => train_number,
            Self::Active(ride) => &ride.train_number,
        }
    }
}

/// Lock-free ride ledger and statistics store.
pub struct RideTracker {
    /// Open slot per user (pending or active)
    slots: DashMap<UserId, RideSlot>,

    /// Completed-ride history per user, insertion order = completion order
    history: DashMap<UserId, Vec<CompletedRide>>,

    /// Cumulative statistics per user, created lazily, never evicted
    stats: DashMap<UserId, UserStats>,
}

impl RideTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            history: DashMap::new(),
            stats: DashMap::new(),
        }
    }

    /// Reserve the user's slot ahead of the external train lookup.
    ///
    /// Fails with [`RideError::AlreadyActive`] when the user already has a
    /// pending or active ride, leaving the existing slot untouched. The
    /// reservation must be resolved with [`activate`](Self::activate) or
    /// released with [`cancel_pending`](Self::cancel_pending).
    pub fn begin_pending(&self, user: UserId, train_number: &str) -> Result<(), RideError> {
        match self.slots.entry(user) {
            Entry::Occupied(occupied) => Err(RideError::AlreadyActive {
                train_number: occupied.get().train_number().to_string(),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(RideSlot::Pending {
                    train_number: train_number.to_string(),
                });
                Ok(())
            }
        }
    }

    /// Release a pending reservation after a failed train lookup.
    ///
    /// Removes the slot only when it is still pending; an active ride is
    /// never dropped here.
    pub fn cancel_pending(&self, user: UserId) {
        self.slots
            .remove_if(&user, |_, slot| matches!(slot, RideSlot::Pending { .. }));
    }

    /// Replace the user's pending reservation with an active ride.
    pub fn activate(&self, user: UserId, ride: ActiveRide) {
        self.slots.insert(user, RideSlot::Active(ride));
    }

    /// The user's active ride, if any. A pending reservation is not a ride.
    pub fn active_ride(&self, user: UserId) -> Option<ActiveRide> {
        self.slots.get(&user).and_then(|slot| match slot.value() {
            RideSlot::Active(ride) => Some(ride.clone()),
            RideSlot::Pending { .. } => None,
        })
    }

    /// Whether the user has an open slot (pending or active).
    pub fn has_open_slot(&self, user: UserId) -> bool {
        self.slots.contains_key(&user)
    }

    /// Snapshot of the user's statistics, created with zero defaults on
    /// first access.
    pub fn stats(&self, user: UserId) -> UserStats {
        self.stats.entry(user).or_default().clone()
    }

    /// Commit a completed ride: update statistics, append to history and
    /// free the slot.
    ///
    /// The streak counter resets to 1 when the streak is broken, because the
    /// ride just completed always opens a new streak.
    ///
    /// # Returns
    /// Snapshot of the user's statistics after the commit.
    pub fn commit_completion(
        &self,
        user: UserId,
        completed: CompletedRide,
        now: DateTime<Utc>,
        is_streak: bool,
    ) -> UserStats {
        let snapshot = {
            let mut stats = self.stats.entry(user).or_default();
            stats.streak_count = if is_streak { stats.streak_count + 1 } else { 1 };
            stats.total_points += completed.points_awarded;
            stats.total_rides += 1;
            stats.total_minutes += completed.duration_minutes;
            stats.last_completion = Some(now);
            stats.level_name = levels::level_for(stats.total_points).name.to_string();
            stats.clone()
        };

        self.history.entry(user).or_default().push(completed);
        self.slots.remove(&user);

        snapshot
    }

    /// Full completed-ride history for a user, oldest first.
    pub fn history(&self, user: UserId) -> Vec<CompletedRide> {
        self.history
            .get(&user)
            .map(|rides| rides.clone())
            .unwrap_or_default()
    }

    /// The user's most recent rides, newest first, at most `limit`.
    pub fn recent_rides(&self, user: UserId, limit: usize) -> Vec<CompletedRide> {
        self.history
            .get(&user)
            .map(|rides| rides.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of every user's statistics.
    pub fn all_stats(&self) -> Vec<(UserId, UserStats)> {
        self.stats
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Number of open slots (pending and active).
    pub fn open_ride_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of users with a statistics record.
    pub fn tracked_user_count(&self) -> usize {
        self.stats.len()
    }
}

impl Default for RideTracker {
    fn default() -> Self {
        Self::new()
    }
}
