//! Error types for the ride lifecycle.
//!
//! Every variant maps to a user-visible rejection; none of them is fatal to
//! the process. Only [`RideError::DataUnavailable`] is worth retrying.

use thiserror::Error;

/// Rejections produced by the ride engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RideError {
    /// The user already has a ride open (active or mid-start)
    #[error("a ride on train {train_number} is already active; finish it first")]
    AlreadyActive { train_number: String },

    /// The user has no ride to finish
    #[error("no active ride; start one first")]
    NoActiveRide,

    /// The supplied train number does not match the open ride
    #[error("the active ride is on train {active}, not {requested}")]
    TrainMismatch { active: String, requested: String },

    /// Rounded duration came out under one minute; the ride stays open
    #[error("a ride must last at least one minute")]
    RideTooShort,

    /// No online train matched the requested number
    #[error("train {requested} is not online ({online} trains online, e.g. {})", .sample.join(", "))]
    TrainNotFound {
        requested: String,
        /// Short sample of online run numbers for guidance
        sample: Vec<String>,
        /// Total number of trains online
        online: usize,
    },

    /// Upstream train data missing or malformed; transient
    #[error("train data unavailable: {0}")]
    DataUnavailable(String),
}

impl RideError {
    /// Whether the caller may retry the same request later unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DataUnavailable(_))
    }
}
