//! Ride Engine Module - ride lifecycle orchestration
//!
//! The engine is the only writer of ride state. It enforces the
//! single-active-ride-per-user rule, resolves trains through the external
//! directory, computes elapsed durations and point awards, commits the
//! completion transactionally through the [`RideTracker`], and dispatches
//! best-effort side effects (announcements, spreadsheet rows) afterwards.
//!
//! Ordering matters in `start_ride`: the user's slot is reserved *before*
//! the train fetch is awaited, otherwise two overlapping start requests
//! could both pass the already-active check while the fetch is in flight.
//! Side effects always run *after* the authoritative state transition and
//! their failures are never rolled back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{info, warn};

use crate::errors::RideError;
use crate::metrics::metrics;
use crate::ride_tracker::RideTracker;
use crate::scoring::compute_points;
use crate::simrail::{canonical_run_number, TrainDirectory};
use crate::sinks::{resolve_or_unknown, NameResolver, Notifier, RideSink};
use crate::types::{ActiveRide, CompletedRide, RideReceipt, UserId};

/// Ride lifecycle controller.
pub struct RideEngine {
    tracker: Arc<RideTracker>,
    trains: Arc<dyn TrainDirectory>,
    notifier: Arc<dyn Notifier>,
    names: Arc<dyn NameResolver>,
    sinks: Vec<Arc<dyn RideSink>>,
    dispatch_channel: String,
    sample_size: usize,
}

impl RideEngine {
    /// Create an engine with no sinks attached.
    pub fn new(
        tracker: Arc<RideTracker>,
        trains: Arc<dyn TrainDirectory>,
        notifier: Arc<dyn Notifier>,
        names: Arc<dyn NameResolver>,
        dispatch_channel: String,
        sample_size: usize,
    ) -> Self {
        Self {
            tracker,
            trains,
            notifier,
            names,
            sinks: Vec::new(),
            dispatch_channel,
            sample_size,
        }
    }

    /// Attach a best-effort completion sink.
    pub fn with_sink(mut self, sink: Arc<dyn RideSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Shared tracker handle, for read-only views.
    pub fn tracker(&self) -> Arc<RideTracker> {
        Arc::clone(&self.tracker)
    }

    /// Open a ride for `user` on the train with the given run number.
    pub async fn start_ride(
        &self,
        user: UserId,
        train_number: &str,
    ) -> Result<ActiveRide, RideError> {
        self.start_ride_at(user, train_number, Utc::now()).await
    }

    /// [`start_ride`](Self::start_ride) with an explicit clock.
    pub async fn start_ride_at(
        &self,
        user: UserId,
        train_number: &str,
        now: DateTime<Utc>,
    ) -> Result<ActiveRide, RideError> {
        let result = self.open_ride(user, train_number, now).await;
        match &result {
            Ok(ride) => {
                metrics().rides_started.inc();
                self.refresh_gauges();
                info!(user, train = %ride.train_number, "ride started");
                self.announce_start(user, ride).await;
            }
            Err(e) => {
                metrics().rides_rejected.inc();
                info!(user, train = train_number, error = %e, "start rejected");
            }
        }
        result
    }

    async fn open_ride(
        &self,
        user: UserId,
        train_number: &str,
        now: DateTime<Utc>,
    ) -> Result<ActiveRide, RideError> {
        let requested = canonical_run_number(train_number);

        // Reserve the slot before the await point below; released on every
        // failure path so a rejected start leaves the user Idle.
        self.tracker.begin_pending(user, &requested)?;

        let trains = match self.trains.fetch_active_trains().await {
            Ok(trains) => trains,
            Err(e) => {
                self.tracker.cancel_pending(user);
                return Err(e);
            }
        };

        if trains.is_empty() {
            self.tracker.cancel_pending(user);
            return Err(RideError::DataUnavailable(
                "no trains are currently online".to_string(),
            ));
        }

        let Some(train) = trains
            .iter()
            .find(|t| canonical_run_number(&t.run_number) == requested)
        else {
            self.tracker.cancel_pending(user);
            return Err(RideError::TrainNotFound {
                requested: train_number.trim().to_string(),
                sample: trains
                    .iter()
                    .take(self.sample_size)
                    .map(|t| t.run_number.clone())
                    .collect(),
                online: trains.len(),
            });
        };

        let ride = ActiveRide {
            train_number: requested,
            start_time: now,
            origin: train.origin.clone(),
            destination: train.destination.clone(),
            train_label: train.label.clone(),
        };
        self.tracker.activate(user, ride.clone());
        Ok(ride)
    }

    /// Finish the active ride. The supplied number must match the ride.
    pub async fn end_ride(
        &self,
        user: UserId,
        train_number: &str,
    ) -> Result<RideReceipt, RideError> {
        self.end_ride_at(user, train_number, Utc::now()).await
    }

    /// [`end_ride`](Self::end_ride) with an explicit clock.
    pub async fn end_ride_at(
        &self,
        user: UserId,
        train_number: &str,
        now: DateTime<Utc>,
    ) -> Result<RideReceipt, RideError> {
        let result = self.close_ride(user, train_number, now);
        match &result {
            Ok(receipt) => {
                let m = metrics();
                m.rides_completed.inc();
                m.points_awarded
                    .inc_by(receipt.completed.points_awarded as u64);
                m.ride_duration_minutes
                    .observe(receipt.completed.duration_minutes as f64);
                self.refresh_gauges();
                info!(
                    user,
                    train = %receipt.completed.train_number,
                    minutes = receipt.completed.duration_minutes,
                    points = receipt.completed.points_awarded,
                    "ride completed"
                );
                self.dispatch_completion(user, receipt).await;
            }
            Err(e) => {
                metrics().rides_rejected.inc();
                info!(user, train = train_number, error = %e, "end rejected");
            }
        }
        result
    }

    /// Validate and commit the completion. Synchronous: every await in the
    /// end path happens after the state transition.
    fn close_ride(
        &self,
        user: UserId,
        train_number: &str,
        now: DateTime<Utc>,
    ) -> Result<RideReceipt, RideError> {
        let active = self.tracker.active_ride(user).ok_or(RideError::NoActiveRide)?;

        let requested = canonical_run_number(train_number);
        if canonical_run_number(&active.train_number) != requested {
            return Err(RideError::TrainMismatch {
                active: active.train_number,
                requested: train_number.trim().to_string(),
            });
        }

        let duration_minutes = active.elapsed_minutes(now);
        if duration_minutes < 1 {
            // No mutation: the ride stays active and can be ended later.
            return Err(RideError::RideTooShort);
        }

        let stats_before = self.tracker.stats(user);
        // Both bonuses may be true for the same ride: a ride on the next
        // calendar day within 24 elapsed hours is first-of-day *and* streak.
        let is_first_of_day = stats_before
            .last_completion
            .map(|last| last.date_naive() != now.date_naive())
            .unwrap_or(true);
        let is_streak = stats_before
            .last_completion
            .map(|last| now - last < chrono::Duration::hours(24))
            .unwrap_or(false);

        let points_awarded =
            compute_points(duration_minutes, &active.train_label, is_streak, is_first_of_day);

        let completed = CompletedRide {
            train_number: active.train_number.clone(),
            start_time: active.start_time,
            end_time: now,
            duration_minutes,
            route: active.route(),
            train_label: active.train_label.clone(),
            points_awarded,
            completion_date: now.date_naive(),
        };

        let stats = self
            .tracker
            .commit_completion(user, completed.clone(), now, is_streak);

        Ok(RideReceipt { completed, stats })
    }

    /// Announce a started ride to the dispatch channel, falling back to the
    /// requester. Never fails the start.
    async fn announce_start(&self, user: UserId, ride: &ActiveRide) {
        let driver = resolve_or_unknown(self.names.as_ref(), user).await;
        let text = format!(
            "✅ Ride on train **{}** ({}) started!\n🚉 {}\n👤 Driver: **{}**",
            ride.train_number,
            ride.train_label,
            ride.route(),
            driver,
        );
        self.notify_dispatch_or_user(user, &text).await;
    }

    /// Emit the completed ride to every sink and announce it. All failures
    /// are logged and counted; the committed state is never touched again.
    async fn dispatch_completion(&self, user: UserId, receipt: &RideReceipt) {
        let driver = resolve_or_unknown(self.names.as_ref(), user).await;

        let appends = self.sinks.iter().map(|sink| {
            let driver = driver.clone();
            async move {
                if let Err(e) = sink
                    .append_completed_ride(&receipt.completed, &driver)
                    .await
                {
                    metrics().sink_failures.inc();
                    warn!(sink = sink.name(), error = %e, "completion sink failed");
                }
            }
        });
        join_all(appends).await;

        let text = format!(
            "🏁 Ride on train **{}** finished!\n👤 Driver: **{}**\n⏰ Duration: **{} min**\n💰 Points: **+{}**\n🏆 Total: **{} points** ({})",
            receipt.completed.train_number,
            driver,
            receipt.completed.duration_minutes,
            receipt.completed.points_awarded,
            receipt.stats.total_points,
            receipt.stats.level_name,
        );
        self.notify_dispatch_or_user(user, &text).await;
    }

    /// Deliver to the dispatch channel, then directly to the user, then give
    /// up with a warning. Delivery failure is always non-fatal.
    async fn notify_dispatch_or_user(&self, user: UserId, text: &str) {
        if let Err(e) = self
            .notifier
            .send_message(&self.dispatch_channel, text)
            .await
        {
            warn!(channel = %self.dispatch_channel, error = %e, "dispatch announcement failed, replying to requester");
            if let Err(e) = self
                .notifier
                .send_message(&format!("user:{}", user), text)
                .await
            {
                warn!(user, error = %e, "direct reply failed as well");
            }
        }
    }

    fn refresh_gauges(&self) {
        let m = metrics();
        m.open_rides.set(self.tracker.open_ride_count() as i64);
        m.tracked_users.set(self.tracker.tracked_user_count() as i64);
    }
}
