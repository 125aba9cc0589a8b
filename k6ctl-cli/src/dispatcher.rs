use std::collections::VecDeque;

use thiserror::Error;
use tracing::info;

use k6ctl_core::api::{ControllerApi, FetchError};
use k6ctl_core::history::History;
use k6ctl_core::model::{PollSnapshot, TestStatus};

use crate::poller::fetch_cycle;

/// A remote mutation requested from the keyboard
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    IncreaseVus,
    DecreaseVus,
}

impl Command {
    /// Copy of `status` with this command applied. VU changes are not
    /// clamped; k6 validates the request.
    pub fn apply(&self, status: &TestStatus, vu_step: i64) -> TestStatus {
        let mut next = status.clone();
        match self {
            Command::TogglePause => next.paused = !next.paused,
            Command::IncreaseVus => next.vus += vu_step,
            Command::DecreaseVus => next.vus -= vu_step,
        }
        next
    }

    pub fn label(&self) -> &'static str {
        match self {
            Command::TogglePause => "pause toggle",
            Command::IncreaseVus => "VU increase",
            Command::DecreaseVus => "VU decrease",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DispatchError {
    #[error("{} ignored: no status received yet", .0.label())]
    NoStatus(Command),
}

/// Queues commands and turns them into PATCH payloads.
///
/// Payloads are built when a command's job starts, from the latest status
/// in history at that moment, so queued commands stack.
pub struct CommandDispatcher {
    vu_step: i64,
    queue: VecDeque<Command>,
}

impl CommandDispatcher {
    pub fn new(vu_step: i64) -> Self {
        Self {
            vu_step,
            queue: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, command: Command) {
        self.queue.push_back(command);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Next command with its PATCH payload, if any is queued
    pub fn next_job(
        &mut self,
        history: &History,
    ) -> Option<Result<(Command, TestStatus), DispatchError>> {
        let command = self.queue.pop_front()?;
        let Some(latest) = history.latest_status() else {
            return Some(Err(DispatchError::NoStatus(command)));
        };
        Some(Ok((command, command.apply(&latest.value, self.vu_step))))
    }
}

/// Outcome of a command job: the PATCH result, then the follow-up poll.
#[derive(Debug)]
pub struct CommandOutcome {
    pub command: Command,
    pub patch: Result<(), FetchError>,
    pub poll: Result<PollSnapshot, FetchError>,
}

/// PATCH `payload`, then re-poll regardless of the PATCH result so the
/// next frame shows what the controller actually accepted.
pub async fn execute(
    api: &dyn ControllerApi,
    command: Command,
    payload: TestStatus,
) -> CommandOutcome {
    info!(
        command = command.label(),
        paused = payload.paused,
        vus = payload.vus,
        "dispatching command"
    );
    let patch = api.patch_status(&payload).await;
    let poll = fetch_cycle(api).await;
    CommandOutcome {
        command,
        patch,
        poll,
    }
}
