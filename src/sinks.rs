//! Best-effort collaborator interfaces and implementations.
//!
//! Everything here sits on the far side of a completed state transition:
//! notification delivery, spreadsheet persistence and display-name lookup
//! may all fail without affecting the authoritative in-memory state. Callers
//! log and count failures, never roll back.

use async_trait::async_trait;
use tracing::info;

use crate::config::SheetsConfig;
use crate::types::{CompletedRide, UserId};

/// Fallback shown when display-name resolution fails.
pub const UNKNOWN_USER: &str = "unknown user";

/// Outbound message delivery, fire-and-forget.
///
/// `destination` is an opaque routing key owned by the chat-platform
/// gateway: a channel identifier, or `user:<id>` for a direct reply.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, destination: &str, text: &str) -> anyhow::Result<()>;
}

/// Durability side-channel for completed rides.
#[async_trait]
pub trait RideSink: Send + Sync {
    /// Short name for logs and metrics.
    fn name(&self) -> &str;

    async fn append_completed_ride(
        &self,
        ride: &CompletedRide,
        actor_name: &str,
    ) -> anyhow::Result<()>;
}

/// Display-name lookup against the chat platform.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve_display_name(&self, user: UserId) -> anyhow::Result<String>;
}

/// Resolve a display name, falling back to [`UNKNOWN_USER`].
pub async fn resolve_or_unknown(resolver: &dyn NameResolver, user: UserId) -> String {
    resolver
        .resolve_display_name(user)
        .await
        .unwrap_or_else(|_| UNKNOWN_USER.to_string())
}

/// Notifier that writes messages to the log.
///
/// Stands in for the chat-platform gateway when none is wired up, so the
/// engine can run (and be demoed) without a live platform connection.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_message(&self, destination: &str, text: &str) -> anyhow::Result<()> {
        info!(%destination, "outbound message:\n{}", text);
        Ok(())
    }
}

/// Name resolver used when no gateway is wired up.
pub struct StaticNameResolver;

#[async_trait]
impl NameResolver for StaticNameResolver {
    async fn resolve_display_name(&self, user: UserId) -> anyhow::Result<String> {
        Ok(format!("user-{}", user))
    }
}

/// Google Sheets append sink.
///
/// Appends one row per completed ride via the `values:append` REST call.
/// Row shape: date, time, actor, train number, route, duration, points and
/// an empty note column.
pub struct SheetsSink {
    http: reqwest::Client,
    endpoint_base: String,
    spreadsheet_id: String,
    range: String,
    api_token: String,
}

/// Production Sheets API host.
const SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com";

impl SheetsSink {
    /// Build the sink when fully configured, `None` otherwise.
    ///
    /// The API token is read from the environment variable named in the
    /// configuration, so credentials stay out of the config file.
    pub fn from_config(config: &SheetsConfig) -> Option<Self> {
        if !config.enabled || config.spreadsheet_id.is_empty() {
            return None;
        }
        let api_token = std::env::var(&config.api_token_env).ok()?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .ok()?;

        Some(Self {
            http,
            endpoint_base: SHEETS_ENDPOINT.to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.range.clone(),
            api_token,
        })
    }

    #[cfg(test)]
    fn for_tests(endpoint_base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint_base: endpoint_base.to_string(),
            spreadsheet_id: "test-sheet".to_string(),
            // No space in the range: mockito matches the raw request path
            range: "rides!A:H".to_string(),
            api_token: "test-token".to_string(),
        }
    }

    fn append_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}:append",
            self.endpoint_base, self.spreadsheet_id, self.range
        )
    }
}

#[async_trait]
impl RideSink for SheetsSink {
    fn name(&self) -> &str {
        "sheets"
    }

    async fn append_completed_ride(
        &self,
        ride: &CompletedRide,
        actor_name: &str,
    ) -> anyhow::Result<()> {
        let row = serde_json::json!({
            "values": [[
                ride.completion_date.format("%d.%m.%Y").to_string(),
                ride.end_time.format("%H:%M:%S").to_string(),
                actor_name,
                ride.train_number,
                ride.route,
                format!("{} min", ride.duration_minutes),
                ride.points_awarded,
                "",
            ]]
        });

        self.http
            .post(self.append_url())
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&self.api_token)
            .json(&row)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
