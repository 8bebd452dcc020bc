//! Configuration module for the ride tracking bot
//!
//! This module handles all configuration loading from TOML files,
//! environment variables, and provides structured configuration types.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Train data API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Announcement dispatch configuration
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Spreadsheet logging configuration
    #[serde(default)]
    pub sheets: SheetsConfig,

    /// Leaderboard configuration
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,

    /// Monitoring and metrics
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the SimRail panel API
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Server code whose trains are tracked
    #[serde(default = "default_server_code")]
    pub server_code: String,

    /// Request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,

    /// How many online run numbers to offer when a train is not found
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Destination key for ride announcements (dispatcher channel)
    #[serde(default = "default_dispatch_channel")]
    pub channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Enable the spreadsheet sink
    #[serde(default)]
    pub enabled: bool,

    /// Target spreadsheet identifier
    #[serde(default)]
    pub spreadsheet_id: String,

    /// Sheet range rows are appended to
    #[serde(default = "default_sheets_range")]
    pub range: String,

    /// Environment variable holding the API token
    #[serde(default = "default_sheets_token_env")]
    pub api_token_env: String,

    /// Request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// Default number of entries shown
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Recent rides shown in a user summary
    #[serde(default = "default_recent_rides")]
    pub recent_rides: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Enable the Prometheus endpoint
    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

// Default value functions
fn default_api_base_url() -> String { "https://panel.simrail.eu:8084".to_string() }
fn default_server_code() -> String { "cz1".to_string() }
fn default_api_timeout() -> u64 { 10 }
fn default_sample_size() -> usize { 5 }
fn default_dispatch_channel() -> String { "dispatch".to_string() }
fn default_sheets_range() -> String { "List 1!A:H".to_string() }
fn default_sheets_token_env() -> String { "SHEETS_API_TOKEN".to_string() }
fn default_top_n() -> usize { 10 }
fn default_recent_rides() -> usize { 5 }
fn default_metrics_port() -> u16 { 9090 }
fn default_true() -> bool { true }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            server_code: default_server_code(),
            timeout_secs: default_api_timeout(),
            sample_size: default_sample_size(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { channel: default_dispatch_channel() }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            spreadsheet_id: String::new(),
            range: default_sheets_range(),
            api_token_env: default_sheets_token_env(),
            timeout_secs: default_api_timeout(),
        }
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            recent_rides: default_recent_rides(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: default_true(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            dispatch: DispatchConfig::default(),
            sheets: SheetsConfig::default(),
            leaderboard: LeaderboardConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_file(path)
    }
}
