//! Poll history backing the dashboard.
//!
//! Three append-only sequences in fetch order. The chart reads the VU
//! series, the rate panel reads the metrics series and commands patch
//! from the latest status.

use crate::model::{MetricsSample, PollSnapshot, Sample, StatusSample, VuSample};

#[derive(Clone, Debug, Default)]
pub struct History {
    status: Vec<StatusSample>,
    metrics: Vec<MetricsSample>,
    vus: Vec<VuSample>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the outcome of one poll cycle.
    ///
    /// The VU sample is derived from the status so `vus().len() ==
    /// status().len()` always holds.
    pub fn record(&mut self, snapshot: PollSnapshot) {
        let PollSnapshot {
            at,
            status,
            metrics,
        } = snapshot;
        self.vus.push(Sample::new(at, status.vus));
        self.status.push(Sample::new(at, status));
        self.metrics.push(Sample::new(at, metrics));
    }

    pub fn status(&self) -> &[StatusSample] {
        &self.status
    }

    pub fn metrics(&self) -> &[MetricsSample] {
        &self.metrics
    }

    pub fn vus(&self) -> &[VuSample] {
        &self.vus
    }

    /// Most recent status, used as the base of every PATCH payload
    pub fn latest_status(&self) -> Option<&StatusSample> {
        self.status.last()
    }

    /// Number of completed poll cycles
    pub fn len(&self) -> usize {
        self.status.len()
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_empty()
    }
}
