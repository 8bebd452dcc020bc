//! Train lookup collaborator: SimRail live-trains client.
//!
//! The upstream `trains-open` endpoint has historically reported the run
//! number under several field names, so every response is normalized into a
//! canonical [`TrainRecord`] right here at the boundary. Nothing past this
//! module sees the raw response shape.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::errors::RideError;
use crate::metrics;
use crate::types::TrainRecord;

/// Label used when upstream omits the train name.
pub const UNNAMED_TRAIN: &str = "unnamed";

/// Source of currently online trains.
#[async_trait]
pub trait TrainDirectory: Send + Sync {
    /// Fetch the trains currently online on the configured server.
    ///
    /// Fails with [`RideError::DataUnavailable`] when the upstream source is
    /// unreachable or returns a malformed response. An empty list is a valid
    /// result; the caller decides what to do with it.
    async fn fetch_active_trains(&self) -> Result<Vec<TrainRecord>, RideError>;
}

/// Reduce a user- or upstream-supplied run number to a canonical form.
///
/// Trims whitespace and strips leading zeros from all-digit values so that
/// numeric and string representations of the same run compare equal.
pub fn canonical_run_number(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        let stripped = trimmed.trim_start_matches('0');
        if stripped.is_empty() {
            return "0".to_string();
        }
        return stripped.to_string();
    }
    trimmed.to_string()
}

/// HTTP client for the SimRail panel API.
pub struct SimRailClient {
    http: reqwest::Client,
    base_url: String,
    server_code: String,
}

impl SimRailClient {
    /// Build a client from the API configuration.
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            server_code: config.server_code.clone(),
        })
    }

    /// Override the server code, e.g. from a CLI flag.
    pub fn with_server_code(mut self, server_code: &str) -> Self {
        self.server_code = server_code.to_string();
        self
    }
}

#[async_trait]
impl TrainDirectory for SimRailClient {
    async fn fetch_active_trains(&self) -> Result<Vec<TrainRecord>, RideError> {
        let url = format!("{}/trains-open", self.base_url);
        let started = Instant::now();

        let result = async {
            let response = self
                .http
                .get(&url)
                .query(&[("serverCode", self.server_code.as_str())])
                .send()
                .await
                .map_err(|e| RideError::DataUnavailable(e.to_string()))?
                .error_for_status()
                .map_err(|e| RideError::DataUnavailable(e.to_string()))?;

            let body: Value = response
                .json()
                .await
                .map_err(|e| RideError::DataUnavailable(e.to_string()))?;

            let Some(list) = body.get("data").and_then(Value::as_array) else {
                return Err(RideError::DataUnavailable(
                    "train list missing from upstream response".to_string(),
                ));
            };

            let trains: Vec<TrainRecord> = list.iter().filter_map(normalize_train).collect();
            debug!(
                server = %self.server_code,
                online = trains.len(),
                "fetched live trains"
            );
            Ok(trains)
        }
        .await;

        metrics::metrics()
            .train_lookup_latency
            .observe(started.elapsed().as_secs_f64());
        if let Err(ref e) = result {
            metrics::metrics().train_lookup_failures.inc();
            warn!(server = %self.server_code, error = %e, "train lookup failed");
        }

        result
    }
}

/// Normalize one raw train object into the canonical record shape.
///
/// Entries with no recognizable run number are dropped.
fn normalize_train(value: &Value) -> Option<TrainRecord> {
    let run_number = field_string(value, &["TrainNoLocal", "TrainNo", "trainNo"])?;

    Some(TrainRecord {
        run_number,
        label: field_string(value, &["TrainName"])
            .unwrap_or_else(|| UNNAMED_TRAIN.to_string()),
        origin: field_string(value, &["StartStation"]).unwrap_or_default(),
        destination: field_string(value, &["EndStation"]).unwrap_or_default(),
    })
}

/// First present field among `keys`, as a string. Numbers are accepted
/// because upstream has served run numbers both ways.
fn field_string(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match value.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            server_code: "cz1".to_string(),
            timeout_secs: 5,
            sample_size: 5,
        }
    }

    #[test]
    fn test_canonical_run_number() {
        assert_eq!(canonical_run_number("32922"), "32922");
        assert_eq!(canonical_run_number(" 32922 "), "32922");
        assert_eq!(canonical_run_number("032922"), "32922");
        assert_eq!(canonical_run_number("000"), "0");
        // Non-numeric identifiers pass through trimmed
        assert_eq!(canonical_run_number(" EC100 "), "EC100");
    }

    #[test]
    fn test_normalize_prefers_local_number_and_defaults_label() {
        let raw = serde_json::json!({
            "TrainNoLocal": "4603",
            "TrainNo": 999,
            "StartStation": "Katowice",
            "EndStation": "Sosnowiec Gł."
        });
        let train = normalize_train(&raw).unwrap();
        assert_eq!(train.run_number, "4603");
        assert_eq!(train.label, UNNAMED_TRAIN);
        assert_eq!(train.origin, "Katowice");
        assert_eq!(train.destination, "Sosnowiec Gł.");
    }

    #[test]
    fn test_normalize_falls_back_across_number_fields() {
        let raw = serde_json::json!({ "trainNo": 32922, "TrainName": "EC 100" });
        let train = normalize_train(&raw).unwrap();
        assert_eq!(train.run_number, "32922");
        assert_eq!(train.label, "EC 100");
    }

    #[test]
    fn test_normalize_drops_unidentifiable_entries() {
        let raw = serde_json::json!({ "TrainName": "ghost" });
        assert!(normalize_train(&raw).is_none());
    }

    #[tokio::test]
    async fn test_fetch_parses_live_train_list() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/trains-open")
            .match_query(mockito::Matcher::UrlEncoded("serverCode".into(), "cz1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"count":2,"data":[
                    {"TrainNoLocal":"32922","TrainName":"EC Fastlane","StartStation":"Praha","EndStation":"Bohumín"},
                    {"TrainNoLocal":"4603","StartStation":"Katowice","EndStation":"Sosnowiec Gł."}
                ]}"#,
            )
            .create_async()
            .await;

        let client = SimRailClient::new(&test_config(&server.url())).unwrap();
        let trains = client.fetch_active_trains().await.unwrap();

        mock.assert_async().await;
        assert_eq!(trains.len(), 2);
        assert_eq!(trains[0].run_number, "32922");
        assert_eq!(trains[0].label, "EC Fastlane");
        assert_eq!(trains[1].label, UNNAMED_TRAIN);
    }

    #[tokio::test]
    async fn test_fetch_without_train_list_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/trains-open")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"count":0}"#)
            .create_async()
            .await;

        let client = SimRailClient::new(&test_config(&server.url())).unwrap();
        let err = client.fetch_active_trains().await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_fetch_http_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/trains-open")
            .match_query(mockito::Matcher::Any)
            .with_status(502)
            .create_async()
            .await;

        let client = SimRailClient::new(&test_config(&server.url())).unwrap();
        let err = client.fetch_active_trains().await.unwrap_err();
        assert!(matches!(err, RideError::DataUnavailable(_)));
    }
}
