//! The k6 REST API contract as seen by the dashboard.
//!
//! Wire documents are decoded into typed records here, so anything that
//! gets past this module has every field the dashboard reads.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::{CounterSnapshot, MetricsSnapshot, TestStatus};

pub const STATUS_PATH: &str = "/v1/status";
pub const METRICS_PATH: &str = "/v1/metrics";

#[derive(Clone, Debug, Error, PartialEq)]
pub enum FetchError {
    /// Connection refused, reset, timed out...
    #[error("transport error on {endpoint}: {details}")]
    Transport {
        endpoint: &'static str,
        details: String,
    },
    /// Non-2xx response or a body that does not match the contract
    #[error("protocol error on {endpoint}: {details}")]
    Protocol {
        endpoint: &'static str,
        details: String,
    },
}

impl FetchError {
    pub fn transport(endpoint: &'static str, details: impl ToString) -> Self {
        Self::Transport {
            endpoint,
            details: details.to_string(),
        }
    }

    pub fn protocol(endpoint: &'static str, details: impl ToString) -> Self {
        Self::Protocol {
            endpoint,
            details: details.to_string(),
        }
    }
}

/// A controller the dashboard can observe and steer.
///
/// Implementations:
/// - `HttpController`: talks to a running k6 instance over HTTP
/// - `FakeController`: in-memory simulation for demo mode and tests
#[async_trait]
pub trait ControllerApi: Send + Sync {
    /// `GET /v1/status`
    async fn status(&self) -> Result<TestStatus, FetchError>;

    /// `GET /v1/metrics`
    async fn metrics(&self) -> Result<MetricsSnapshot, FetchError>;

    /// `PATCH /v1/status`; only success or failure is reported
    async fn patch_status(&self, status: &TestStatus) -> Result<(), FetchError>;

    /// Short name shown in logs
    fn name(&self) -> &'static str;
}

#[derive(Debug, Deserialize)]
struct StatusDocument {
    data: StatusData,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    attributes: TestStatus,
    /// `type`, `id` and anything else k6 puts next to the attributes
    #[serde(flatten)]
    resource: BTreeMap<String, serde_json::Value>,
}

/// The `data` object of a PATCH, rebuilt from a status
#[derive(Serialize)]
struct StatusPatchData<'a> {
    #[serde(flatten)]
    resource: &'a BTreeMap<String, serde_json::Value>,
    attributes: &'a TestStatus,
}

#[derive(Debug, Deserialize)]
struct MetricsDocument {
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct MetricEntry {
    id: String,
    attributes: MetricAttributes,
}

#[derive(Debug, Deserialize)]
struct MetricAttributes {
    #[serde(default)]
    sample: CounterSnapshot,
}

/// Decode a `GET /v1/status` body.
pub fn decode_status(body: &str) -> Result<TestStatus, FetchError> {
    let doc: StatusDocument =
        serde_json::from_str(body).map_err(|e| FetchError::protocol(STATUS_PATH, e))?;
    let StatusData {
        mut attributes,
        resource,
    } = doc.data;
    attributes.resource = resource;
    Ok(attributes)
}

/// Decode a `GET /v1/metrics` body.
///
/// A missing `data` array fails the whole document; individual entries
/// that do not look like a metric are skipped.
pub fn decode_metrics(body: &str) -> Result<MetricsSnapshot, FetchError> {
    let doc: MetricsDocument =
        serde_json::from_str(body).map_err(|e| FetchError::protocol(METRICS_PATH, e))?;

    let mut snapshot = MetricsSnapshot::new();
    for raw in doc.data {
        match serde_json::from_value::<MetricEntry>(raw) {
            Ok(entry) => {
                snapshot.insert(entry.id, entry.attributes.sample);
            }
            Err(e) => debug!(error = %e, "skipping malformed metrics entry"),
        }
    }
    Ok(snapshot)
}

/// Body of a `PATCH /v1/status` request carrying `status`: the `data`
/// object as it was received, with the attributes replaced.
pub fn encode_status_patch(status: &TestStatus) -> serde_json::Value {
    let data = StatusPatchData {
        resource: &status.resource,
        attributes: status,
    };
    serde_json::json!({ "data": data })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS_BODY: &str = r#"{
        "data": {
            "type": "status",
            "id": "default",
            "attributes": {
                "paused": false,
                "vus": 10,
                "vus-max": 100,
                "stopped": false,
                "running": true,
                "tainted": false
            }
        }
    }"#;

    #[test]
    fn test_decode_status() {
        let status = decode_status(STATUS_BODY).unwrap();
        assert!(status.running);
        assert!(!status.paused);
        assert!(!status.tainted);
        assert_eq!(status.vus, 10);
        assert_eq!(status.vus_max, 100);
        assert_eq!(status.extra.get("stopped"), Some(&serde_json::json!(false)));
    }

    #[test]
    fn test_decode_status_missing_field_is_protocol_error() {
        let body = r#"{"data": {"attributes": {"running": true, "paused": false, "tainted": false, "vus": 1}}}"#;
        assert!(matches!(
            decode_status(body),
            Err(FetchError::Protocol { endpoint: STATUS_PATH, .. })
        ));
    }

    #[test]
    fn test_decode_status_garbage_is_protocol_error() {
        assert!(matches!(decode_status("<html>"), Err(FetchError::Protocol { .. })));
    }

    #[test]
    fn test_decode_metrics_skips_malformed_entries() {
        let body = r#"{
            "data": [
                {"type": "metrics", "id": "http_reqs", "attributes": {"type": "counter", "sample": {"count": 1200, "rate": 40.5}}},
                {"type": "metrics", "id": "vus", "attributes": {"sample": {"value": 10}}},
                {"type": "metrics", "attributes": {"sample": {"count": 3}}},
                "not-an-object"
            ]
        }"#;
        let snapshot = decode_metrics(body).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["http_reqs"].count, Some(1200.0));
        assert_eq!(snapshot["vus"].count, None);
        assert_eq!(snapshot["vus"].value, Some(10.0));
    }

    #[test]
    fn test_decode_metrics_without_data_is_protocol_error() {
        assert!(matches!(
            decode_metrics(r#"{"errors": []}"#),
            Err(FetchError::Protocol { endpoint: METRICS_PATH, .. })
        ));
    }

    #[test]
    fn test_patch_body_round_trips_unknown_attributes() {
        let mut status = decode_status(STATUS_BODY).unwrap();
        status.paused = true;

        let body = encode_status_patch(&status);
        let attrs = &body["data"]["attributes"];
        assert_eq!(attrs["paused"], serde_json::json!(true));
        assert_eq!(attrs["vus-max"], serde_json::json!(100));
        assert_eq!(attrs["stopped"], serde_json::json!(false));
    }

    #[test]
    fn test_patch_body_keeps_resource_type_and_id() {
        let status = decode_status(STATUS_BODY).unwrap();
        assert_eq!(status.resource.get("type"), Some(&serde_json::json!("status")));
        assert!(!status.extra.contains_key("type"));

        let body = encode_status_patch(&status);
        assert_eq!(body["data"]["type"], serde_json::json!("status"));
        assert_eq!(body["data"]["id"], serde_json::json!("default"));
        assert!(body["data"]["attributes"].get("type").is_none());
        assert!(body["data"]["attributes"].get("id").is_none());
    }

    #[test]
    fn test_patch_body_without_resource_members() {
        let body = encode_status_patch(&TestStatus::new(true, false, 3, 10));
        let data = body["data"].as_object().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(body["data"]["attributes"]["vus"], serde_json::json!(3));
    }
}
