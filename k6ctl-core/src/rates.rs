//! Per-second rates for k6 counters.
//!
//! Rates are derived by differencing the latest metrics snapshot against
//! the one taken two polls earlier, which smooths single-poll jitter.

use thiserror::Error;

use crate::model::{MetricsSample, Timestamp};

/// Counters shown in the metrics panel, as (metric id, label).
pub const TRACKED_METRICS: [(&str, &str); 4] = [
    ("iterations", "Iterations"),
    ("data_received", "Data received"),
    ("data_sent", "Data sent"),
    ("http_reqs", "HTTP requests"),
];

/// Snapshots needed before any rate can be derived.
pub const MIN_SAMPLES: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Rate {
    Available(f64),
    /// Not enough data, or the counter is missing from a snapshot.
    /// Distinct from a rate of zero.
    Unavailable,
}

impl Rate {
    pub fn per_second(&self) -> Option<f64> {
        match self {
            Rate::Available(r) => Some(*r),
            Rate::Unavailable => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RateLine {
    pub id: String,
    pub label: String,
    pub rate: Rate,
}

/// Rates in the order the names were requested.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RateModel {
    pub lines: Vec<RateLine>,
}

impl RateModel {
    /// Every name reported as unavailable
    pub fn unavailable(names: &[(&str, &str)]) -> Self {
        Self {
            lines: names
                .iter()
                .map(|(id, label)| RateLine {
                    id: (*id).to_string(),
                    label: (*label).to_string(),
                    rate: Rate::Unavailable,
                })
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<Rate> {
        self.lines.iter().find(|l| l.id == id).map(|l| l.rate)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RateError {
    #[error("metrics samples at {at} share a timestamp, cannot derive rates")]
    ZeroInterval { at: Timestamp },
}

/// Derive per-second rates for `names` from `metrics`.
///
/// With fewer than [`MIN_SAMPLES`] snapshots every rate is unavailable.
/// Fails with [`RateError::ZeroInterval`] when the two compared snapshots
/// are not separated in time; callers keep their previous model then.
pub fn derive_rates(
    metrics: &[MetricsSample],
    names: &[(&str, &str)],
) -> Result<RateModel, RateError> {
    if metrics.len() < MIN_SAMPLES {
        return Ok(RateModel::unavailable(names));
    }

    let last = &metrics[metrics.len() - 1];
    let prev = &metrics[metrics.len() - MIN_SAMPLES];

    let micros = (last.at - prev.at).num_microseconds().unwrap_or(0);
    if micros <= 0 {
        return Err(RateError::ZeroInterval { at: last.at });
    }
    let interval_secs = micros as f64 / 1_000_000.0;

    let lines = names
        .iter()
        .map(|(id, label)| {
            let now = last.value.get(*id).and_then(|c| c.count);
            let before = prev.value.get(*id).and_then(|c| c.count);
            let rate = match (now, before) {
                (Some(now), Some(before)) => Rate::Available((now - before) / interval_secs),
                _ => Rate::Unavailable,
            };
            RateLine {
                id: (*id).to_string(),
                label: (*label).to_string(),
                rate,
            }
        })
        .collect();

    Ok(RateModel { lines })
}
