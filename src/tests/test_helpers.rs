//! Shared mocks and builders for the ride flow tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::errors::RideError;
use crate::ride_engine::RideEngine;
use crate::ride_tracker::RideTracker;
use crate::simrail::TrainDirectory;
use crate::sinks::{Notifier, RideSink, StaticNameResolver};
use crate::types::{CompletedRide, TrainRecord};

/// Canned train directory: a fixed list, or an outage.
pub struct MockDirectory {
    trains: Vec<TrainRecord>,
    fail: bool,
}

impl MockDirectory {
    pub fn with_trains(trains: Vec<TrainRecord>) -> Self {
        Self { trains, fail: false }
    }

    pub fn failing() -> Self {
        Self { trains: vec![], fail: true }
    }
}

#[async_trait]
impl TrainDirectory for MockDirectory {
    async fn fetch_active_trains(&self) -> Result<Vec<TrainRecord>, RideError> {
        if self.fail {
            return Err(RideError::DataUnavailable("mock outage".to_string()));
        }
        Ok(self.trains.clone())
    }
}

/// Notifier that records deliveries and can fail selected destinations.
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    fail_destinations: HashSet<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_destinations: HashSet::new(),
        }
    }

    pub fn failing_for(destination: &str) -> Self {
        let mut fail_destinations = HashSet::new();
        fail_destinations.insert(destination.to_string());
        Self {
            sent: Mutex::new(Vec::new()),
            fail_destinations,
        }
    }

    pub fn destinations(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(destination, _)| destination.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, destination: &str, text: &str) -> anyhow::Result<()> {
        if self.fail_destinations.contains(destination) {
            anyhow::bail!("destination {} unreachable", destination);
        }
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), text.to_string()));
        Ok(())
    }
}

/// Sink that records appended rows, or fails every append.
pub struct RecordingSink {
    pub rows: Mutex<Vec<(CompletedRide, String)>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self { rows: Mutex::new(Vec::new()), fail: false }
    }

    pub fn failing() -> Self {
        Self { rows: Mutex::new(Vec::new()), fail: true }
    }
}

#[async_trait]
impl RideSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn append_completed_ride(
        &self,
        ride: &CompletedRide,
        actor_name: &str,
    ) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("sink down");
        }
        self.rows
            .lock()
            .unwrap()
            .push((ride.clone(), actor_name.to_string()));
        Ok(())
    }
}

/// A train record with the default test route.
pub fn train(run_number: &str, label: &str) -> TrainRecord {
    TrainRecord {
        run_number: run_number.to_string(),
        label: label.to_string(),
        origin: "Praha hl.n.".to_string(),
        destination: "Bohumín".to_string(),
    }
}

/// Engine over a fresh tracker with the given collaborators.
pub fn engine_with(
    trains: Arc<dyn TrainDirectory>,
    notifier: Arc<RecordingNotifier>,
) -> RideEngine {
    RideEngine::new(
        Arc::new(RideTracker::new()),
        trains,
        notifier,
        Arc::new(StaticNameResolver),
        "dispatch".to_string(),
        5,
    )
}
