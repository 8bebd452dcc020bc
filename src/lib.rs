//! Railbot - ride tracking and scoring core for a SimRail community bot
//!
//! This library exposes the core modules for testing and integration
//! purposes. The binary in `main.rs` wires them to the live collaborators.

pub mod config;
pub mod endpoints;
pub mod errors;
pub mod leaderboard;
pub mod levels;
pub mod metrics;
pub mod ride_engine;
pub mod ride_tracker;
pub mod scoring;
pub mod simrail;
pub mod sinks;
pub mod types;

#[cfg(test)]
mod tests;
