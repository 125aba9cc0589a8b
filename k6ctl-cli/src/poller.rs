use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tokio::sync::mpsc;
use tracing::debug;

use k6ctl_core::api::{ControllerApi, FetchError};
use k6ctl_core::model::{PollSnapshot, TestStatus};

use crate::dispatcher::{self, Command, CommandOutcome};

/// One poll cycle: status then metrics. Both must succeed; nothing is
/// returned for a half-finished cycle.
pub async fn fetch_cycle(api: &dyn ControllerApi) -> Result<PollSnapshot, FetchError> {
    let at = Local::now();
    let status = api.status().await?;
    let metrics = api.metrics().await?;
    Ok(PollSnapshot {
        at,
        status,
        metrics,
    })
}

/// A finished network job
#[derive(Debug)]
pub enum JobOutcome {
    Polled(Result<PollSnapshot, FetchError>),
    Commanded(CommandOutcome),
}

/// Owns the polling schedule and runs network jobs off the UI loop.
///
/// Jobs run on spawned tasks and report back over a channel that the
/// dashboard drains once per iteration. At most one job is in flight, so
/// results arrive in the order they were started. Each result carries the
/// instant its task finished; the schedule runs from there rather than
/// from whenever the dashboard got round to collecting it.
pub struct Poller {
    api: Arc<dyn ControllerApi>,
    interval: Duration,
    last_fetch: Option<Instant>,
    in_flight: bool,
    tx: mpsc::UnboundedSender<(Instant, JobOutcome)>,
    rx: mpsc::UnboundedReceiver<(Instant, JobOutcome)>,
}

impl Poller {
    pub fn new(api: Arc<dyn ControllerApi>, interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            api,
            interval,
            last_fetch: None,
            in_flight: false,
            tx,
            rx,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// True once `interval` has passed since the last job finished
    pub fn is_due(&self, now: Instant) -> bool {
        !self.in_flight
            && self
                .last_fetch
                .is_none_or(|last| now > last + self.interval)
    }

    pub fn spawn_poll(&mut self) {
        self.in_flight = true;
        let api = self.api.clone();
        let tx = self.tx.clone();
        debug!(api = api.name(), "starting poll");
        tokio::spawn(async move {
            let result = fetch_cycle(api.as_ref()).await;
            let _ = tx.send((Instant::now(), JobOutcome::Polled(result)));
        });
    }

    pub fn spawn_command(&mut self, command: Command, payload: TestStatus) {
        self.in_flight = true;
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = dispatcher::execute(api.as_ref(), command, payload).await;
            let _ = tx.send((Instant::now(), JobOutcome::Commanded(outcome)));
        });
    }

    /// Take the finished job, if any, without waiting. Stamps the fetch
    /// time whatever the outcome so failures are retried on the normal
    /// cadence.
    pub fn try_collect(&mut self) -> Option<JobOutcome> {
        let (finished, outcome) = self.rx.try_recv().ok()?;
        self.finish(finished);
        Some(outcome)
    }

    /// Wait for the in-flight job. `None` when nothing is running.
    pub async fn wait(&mut self) -> Option<JobOutcome> {
        if !self.in_flight {
            return None;
        }
        let (finished, outcome) = self.rx.recv().await?;
        self.finish(finished);
        Some(outcome)
    }

    fn finish(&mut self, finished: Instant) {
        self.in_flight = false;
        self.last_fetch = Some(finished);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeController;

    fn poller(fake: Arc<FakeController>) -> Poller {
        Poller::new(fake, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_fetch_cycle_pairs_status_and_metrics() {
        let fake = FakeController::demo();
        let snap = fetch_cycle(&fake).await.unwrap();
        assert_eq!(snap.status.vus, 10);
        assert!(snap.metrics.contains_key("http_reqs"));
    }

    #[tokio::test]
    async fn test_fetch_cycle_fails_as_a_whole() {
        let fake = FakeController::demo();
        fake.break_metrics(1);
        assert!(matches!(
            fetch_cycle(&fake).await,
            Err(FetchError::Protocol { .. })
        ));
        assert!(fetch_cycle(&fake).await.is_ok());
    }

    #[tokio::test]
    async fn test_due_only_after_interval() {
        let mut p = poller(Arc::new(FakeController::demo()));
        let start = Instant::now();
        assert!(p.is_due(start));

        p.spawn_poll();
        assert!(p.is_busy());
        assert!(!p.is_due(start + Duration::from_secs(10)));

        let outcome = p.wait().await;
        assert!(matches!(outcome, Some(JobOutcome::Polled(Ok(_)))));
        assert!(!p.is_busy());

        let finished = p.last_fetch.unwrap();
        assert!(!p.is_due(finished + Duration::from_millis(500)));
        assert!(!p.is_due(finished + Duration::from_secs(1)));
        assert!(p.is_due(finished + Duration::from_millis(1001)));
    }

    #[tokio::test]
    async fn test_failure_still_stamps_fetch_time() {
        let fake = Arc::new(FakeController::demo());
        fake.go_offline(1);
        let mut p = poller(fake);

        p.spawn_poll();
        let outcome = p.wait().await;
        assert!(matches!(outcome, Some(JobOutcome::Polled(Err(_)))));
        assert!(p.last_fetch.is_some());
    }

    #[tokio::test]
    async fn test_schedule_runs_from_job_completion() {
        let mut p = poller(Arc::new(FakeController::demo()));
        let started = Instant::now();
        p.spawn_poll();

        // the job finishes long before it is collected
        tokio::time::sleep(Duration::from_millis(5)).await;
        let finished_by = Instant::now();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let collected = Instant::now();

        assert!(matches!(p.try_collect(), Some(JobOutcome::Polled(Ok(_)))));
        let last = p.last_fetch.unwrap();
        assert!(last >= started);
        assert!(last <= finished_by);
        assert!(last < collected);
        assert!(p.is_due(finished_by + Duration::from_millis(1001)));
    }

    #[tokio::test]
    async fn test_wait_when_idle() {
        let mut p = poller(Arc::new(FakeController::demo()));
        assert!(p.wait().await.is_none());
        assert!(p.try_collect().is_none());
    }

    #[tokio::test]
    async fn test_command_job_reports_patch_and_poll() {
        let fake = Arc::new(FakeController::demo());
        let mut p = poller(fake.clone());

        let payload = Command::DecreaseVus.apply(&fake.current(), 3);
        p.spawn_command(Command::DecreaseVus, payload);

        match p.wait().await {
            Some(JobOutcome::Commanded(outcome)) => {
                assert!(outcome.patch.is_ok());
                assert_eq!(outcome.poll.unwrap().status.vus, 7);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
