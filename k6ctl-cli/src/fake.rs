use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use k6ctl_core::api::{ControllerApi, FetchError, METRICS_PATH, STATUS_PATH};
use k6ctl_core::model::{CounterSnapshot, MetricsSnapshot, TestStatus};

/// Bytes moved per iteration by the simulated test
const BYTES_RECEIVED_PER_ITER: f64 = 5_120.0;
const BYTES_SENT_PER_ITER: f64 = 384.0;
const REQS_PER_ITER: f64 = 2.0;

#[derive(Debug)]
struct FakeState {
    status: TestStatus,
    iterations: f64,
    /// Remaining calls that fail with a transport error
    offline_calls: u32,
    /// Remaining metrics calls that fail with a protocol error
    broken_metrics: u32,
    patches: Vec<TestStatus>,
}

/// In-memory controller. Accepts every PATCH as-is and, while running and
/// not paused, advances its counters by `vus` iterations per metrics poll.
pub struct FakeController {
    state: Mutex<FakeState>,
}

impl FakeController {
    pub fn new(status: TestStatus) -> Self {
        Self {
            state: Mutex::new(FakeState {
                status,
                iterations: 0.0,
                offline_calls: 0,
                broken_metrics: 0,
                patches: Vec::new(),
            }),
        }
    }

    /// A running 10 VU test, used by `--demo`
    pub fn demo() -> Self {
        Self::new(TestStatus::new(true, false, 10, 50))
    }

    #[cfg(test)]
    /// Fail the next `calls` requests with a transport error
    pub fn go_offline(&self, calls: u32) {
        self.lock().offline_calls = calls;
    }

    #[cfg(test)]
    /// Fail the next `calls` metrics requests with a protocol error while
    /// status keeps working
    pub fn break_metrics(&self, calls: u32) {
        self.lock().broken_metrics = calls;
    }

    #[cfg(test)]
    /// Every PATCH payload received, oldest first
    pub fn patches(&self) -> Vec<TestStatus> {
        self.lock().patches.clone()
    }

    #[cfg(test)]
    pub fn current(&self) -> TestStatus {
        self.lock().status.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        // A panic while holding the lock only happens in a failing test
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_online(state: &mut FakeState, endpoint: &'static str) -> Result<(), FetchError> {
        if state.offline_calls > 0 {
            state.offline_calls -= 1;
            return Err(FetchError::transport(endpoint, "connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl ControllerApi for FakeController {
    async fn status(&self) -> Result<TestStatus, FetchError> {
        let mut state = self.lock();
        Self::check_online(&mut state, STATUS_PATH)?;
        Ok(state.status.clone())
    }

    async fn metrics(&self) -> Result<MetricsSnapshot, FetchError> {
        let mut state = self.lock();
        Self::check_online(&mut state, METRICS_PATH)?;
        if state.broken_metrics > 0 {
            state.broken_metrics -= 1;
            return Err(FetchError::protocol(METRICS_PATH, "missing field `data`"));
        }

        if state.status.running && !state.status.paused {
            state.iterations += state.status.vus.max(0) as f64;
        }
        let iterations = state.iterations;

        let mut snapshot = MetricsSnapshot::new();
        snapshot.insert("iterations".into(), CounterSnapshot::counter(iterations));
        snapshot.insert(
            "http_reqs".into(),
            CounterSnapshot::counter(iterations * REQS_PER_ITER),
        );
        snapshot.insert(
            "data_received".into(),
            CounterSnapshot::counter(iterations * BYTES_RECEIVED_PER_ITER),
        );
        snapshot.insert(
            "data_sent".into(),
            CounterSnapshot::counter(iterations * BYTES_SENT_PER_ITER),
        );
        snapshot.insert(
            "vus".into(),
            CounterSnapshot {
                count: None,
                value: Some(state.status.vus as f64),
            },
        );
        Ok(snapshot)
    }

    async fn patch_status(&self, status: &TestStatus) -> Result<(), FetchError> {
        let mut state = self.lock();
        Self::check_online(&mut state, STATUS_PATH)?;
        state.patches.push(status.clone());
        state.status = status.clone();
        debug!(received = state.patches.len(), "fake controller applied PATCH");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
