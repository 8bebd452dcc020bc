//! Metrics collection and export module

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub rides_started: IntCounter,
    pub rides_completed: IntCounter,
    pub rides_rejected: IntCounter,
    pub points_awarded: IntCounter,
    pub train_lookup_failures: IntCounter,
    pub sink_failures: IntCounter,

    // Gauges
    pub open_rides: IntGauge,
    pub tracked_users: IntGauge,

    // Histograms
    pub ride_duration_minutes: Histogram,
    pub train_lookup_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let rides_started = IntCounter::with_opts(Opts::new(
            "rides_started_total",
            "Number of rides successfully started",
        ))?;

        let rides_completed = IntCounter::with_opts(Opts::new(
            "rides_completed_total",
            "Number of rides completed and committed",
        ))?;

        let rides_rejected = IntCounter::with_opts(Opts::new(
            "rides_rejected_total",
            "Number of start/end requests rejected",
        ))?;

        let points_awarded = IntCounter::with_opts(Opts::new(
            "points_awarded_total",
            "Total points awarded across all completions",
        ))?;

        let train_lookup_failures = IntCounter::with_opts(Opts::new(
            "train_lookup_failures_total",
            "Failed fetches from the train data source",
        ))?;

        let sink_failures = IntCounter::with_opts(Opts::new(
            "sink_failures_total",
            "Best-effort sink dispatches that failed",
        ))?;

        let open_rides = IntGauge::with_opts(Opts::new(
            "open_rides",
            "Rides currently open (pending or active)",
        ))?;

        let tracked_users = IntGauge::with_opts(Opts::new(
            "tracked_users",
            "Users with a statistics record",
        ))?;

        let ride_duration_minutes = Histogram::with_opts(
            HistogramOpts::new("ride_duration_minutes", "Completed ride duration")
                .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 240.0]),
        )?;

        let train_lookup_latency = Histogram::with_opts(
            HistogramOpts::new(
                "train_lookup_latency_seconds",
                "Latency of live-train fetches",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(rides_started.clone()))?;
        registry.register(Box::new(rides_completed.clone()))?;
        registry.register(Box::new(rides_rejected.clone()))?;
        registry.register(Box::new(points_awarded.clone()))?;
        registry.register(Box::new(train_lookup_failures.clone()))?;
        registry.register(Box::new(sink_failures.clone()))?;
        registry.register(Box::new(open_rides.clone()))?;
        registry.register(Box::new(tracked_users.clone()))?;
        registry.register(Box::new(ride_duration_minutes.clone()))?;
        registry.register(Box::new(train_lookup_latency.clone()))?;

        Ok(Self {
            registry,
            rides_started,
            rides_completed,
            rides_rejected,
            points_awarded,
            train_lookup_failures,
            sink_failures,
            open_rides,
            tracked_users,
            ride_duration_minutes,
            train_lookup_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}
