use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Wall-clock time a sample was taken (local time, shown as HH:MM:SS).
pub type Timestamp = DateTime<Local>;

/// A single observation. Immutable once appended to [`crate::history::History`].
#[derive(Clone, Debug, PartialEq)]
pub struct Sample<T> {
    pub at: Timestamp,
    pub value: T,
}

impl<T> Sample<T> {
    pub fn new(at: Timestamp, value: T) -> Self {
        Self { at, value }
    }
}

/// Test state as reported by `GET /v1/status`.
///
/// Attributes the dashboard does not know about are kept in `extra`, and
/// the members of the `data` object around them (`type`, `id`) in
/// `resource`, so a PATCH echoes both back untouched.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TestStatus {
    pub running: bool,
    pub paused: bool,
    pub tainted: bool,
    #[serde(rename = "vus-max")]
    pub vus_max: i64,
    pub vus: i64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
    /// `data` members beside `attributes`; not part of the attributes
    #[serde(skip)]
    pub resource: BTreeMap<String, serde_json::Value>,
}

impl TestStatus {
    pub fn new(running: bool, paused: bool, vus: i64, vus_max: i64) -> Self {
        Self {
            running,
            paused,
            tainted: false,
            vus_max,
            vus,
            extra: BTreeMap::new(),
            resource: BTreeMap::new(),
        }
    }
}

/// One counter entry of `GET /v1/metrics`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct CounterSnapshot {
    #[serde(default)]
    pub count: Option<f64>,
    #[serde(default)]
    pub value: Option<f64>,
}

impl CounterSnapshot {
    pub fn counter(count: f64) -> Self {
        Self {
            count: Some(count),
            value: None,
        }
    }
}

/// Metric id -> latest counter snapshot for one poll.
pub type MetricsSnapshot = BTreeMap<String, CounterSnapshot>;

pub type StatusSample = Sample<TestStatus>;
pub type MetricsSample = Sample<MetricsSnapshot>;
pub type VuSample = Sample<i64>;

/// Result of one successful poll cycle: status and metrics share a timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct PollSnapshot {
    pub at: Timestamp,
    pub status: TestStatus,
    pub metrics: MetricsSnapshot,
}
