//! The dashboard event loop.
//!
//! One iteration: read at most one input event, react to it (resizes
//! recompute the layout right away), draw once if anything changed, then
//! collect finished network jobs and start the next one. Results that land
//! after the draw are shown on the following iteration, so every frame
//! reflects a consistent layout and history.

use std::io;
use std::sync::Arc;
use std::time::Instant;

use ratatui::Terminal;
use ratatui::backend::Backend;
use tracing::{debug, info, warn};

use k6ctl_core::api::{ControllerApi, FetchError};
use k6ctl_core::chart::{self, ChartModel};
use k6ctl_core::config::Config;
use k6ctl_core::history::History;
use k6ctl_core::layout::{self, Regions};
use k6ctl_core::model::PollSnapshot;
use k6ctl_core::rates::{self, RateModel, TRACKED_METRICS};

use crate::dispatcher::{CommandDispatcher, CommandOutcome};
use crate::input::{InputEvent, InputSource};
use crate::poller::{JobOutcome, Poller};
use crate::ui::{self, Notice, View};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Dashboard<'a> {
    config: &'a Config,
    history: History,
    regions: Regions,
    plot: (usize, usize),
    chart: ChartModel,
    rates: RateModel,
    poller: Poller,
    dispatcher: CommandDispatcher,
    notice: Option<Notice>,
    /// Something changed since the last frame
    dirty: bool,
    frames: u64,
}

impl<'a> Dashboard<'a> {
    pub fn new(config: &'a Config, api: Arc<dyn ControllerApi>, width: u16, height: u16) -> Self {
        let regions = layout::compute(height, width, config.show_debug);
        Self {
            config,
            history: History::new(),
            regions,
            plot: regions.chart.plot_area(),
            chart: ChartModel::default(),
            rates: RateModel::unavailable(&TRACKED_METRICS),
            poller: Poller::new(api, config.refresh_interval),
            dispatcher: CommandDispatcher::new(config.vu_step),
            notice: Some(Notice::info("Starting...")),
            dirty: true,
            frames: 0,
        }
    }

    /// Run the initial poll and apply its result
    pub async fn start(&mut self) {
        info!(url = %self.config.base_url, "initial poll");
        self.poller.spawn_poll();
        self.settle().await;
    }

    /// Draw the first frame, poll once, then loop until the user quits
    pub async fn run<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        input: &mut impl InputSource,
    ) -> io::Result<()> {
        self.redraw(terminal)?;
        self.start().await;
        loop {
            if self.step(terminal, input).await? == Flow::Quit {
                info!(frames = self.frames, polls = self.history.len(), "quitting");
                return Ok(());
            }
        }
    }

    /// One loop iteration. Only terminal I/O errors escape.
    pub async fn step<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        input: &mut impl InputSource,
    ) -> io::Result<Flow> {
        if let Some(event) = input.next_event()? {
            match event {
                InputEvent::Quit => return Ok(Flow::Quit),
                InputEvent::Command(command) => {
                    debug!(command = command.label(), "queued");
                    self.dispatcher.enqueue(command);
                    self.dirty = true;
                }
                InputEvent::Resize(cols, rows) => self.resize(cols, rows),
            }
        }

        if self.dirty {
            self.redraw(terminal)?;
        }

        self.pump_network(Instant::now());
        tokio::task::yield_now().await;
        Ok(Flow::Continue)
    }

    /// Recompute every region and the chart for a `cols` x `rows` terminal
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.regions = layout::compute(rows, cols, self.config.show_debug);
        self.plot = self.regions.chart.plot_area();
        self.chart = chart::render(self.history.vus(), self.plot.0, self.plot.1);
        debug!(cols, rows, plot = ?self.plot, "resized");
        self.dirty = true;
    }

    fn redraw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        let view = View {
            regions: &self.regions,
            history: &self.history,
            chart: &self.chart,
            plot: self.plot,
            rates: &self.rates,
            notice: self.notice.as_ref(),
            pending: self.dispatcher.pending(),
        };
        terminal.draw(|f| ui::draw(f, &view))?;
        self.frames += 1;
        self.dirty = false;
        Ok(())
    }

    /// Collect a finished job, then start the next one: queued commands
    /// go first, a poll only when the interval has passed.
    fn pump_network(&mut self, now: Instant) {
        if let Some(outcome) = self.poller.try_collect() {
            self.apply_outcome(outcome);
        }
        if self.poller.is_busy() {
            return;
        }

        match self.dispatcher.next_job(&self.history) {
            Some(Ok((command, payload))) => self.poller.spawn_command(command, payload),
            Some(Err(e)) => {
                warn!(error = %e, "command dropped");
                self.notice = Some(Notice::warn(e.to_string()));
                self.dirty = true;
            }
            None if self.poller.is_due(now) => self.poller.spawn_poll(),
            None => {}
        }
    }

    /// Wait for the in-flight job, if any, and apply it
    pub async fn settle(&mut self) {
        if let Some(outcome) = self.poller.wait().await {
            self.apply_outcome(outcome);
        }
    }

    fn apply_outcome(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Polled(result) => {
                if self.apply_poll(result) {
                    self.notice = Some(Notice::info(format!(
                        "fetched status and metrics ({} samples)",
                        self.history.len()
                    )));
                }
            }
            JobOutcome::Commanded(CommandOutcome {
                command,
                patch,
                poll,
            }) => {
                let accepted = match patch {
                    Ok(()) => {
                        info!(command = command.label(), "PATCH accepted");
                        Notice::info(format!("{} sent", command.label()))
                    }
                    Err(e) => {
                        warn!(command = command.label(), error = %e, "PATCH failed");
                        Notice::error(format!("{} failed: {}", command.label(), e))
                    }
                };
                self.notice = Some(accepted);
                self.apply_poll(poll);
            }
        }
        self.dirty = true;
    }

    /// Record a successful poll and refresh derived models. Failures leave
    /// history as it was. Returns whether the poll succeeded.
    fn apply_poll(&mut self, result: Result<PollSnapshot, FetchError>) -> bool {
        match result {
            Ok(snapshot) => {
                self.history.record(snapshot);
                self.refresh_models();
                true
            }
            Err(e) => {
                warn!(error = %e, "poll failed");
                self.notice = Some(Notice::error(e.to_string()));
                false
            }
        }
    }

    fn refresh_models(&mut self) {
        self.chart = chart::render(self.history.vus(), self.plot.0, self.plot.1);
        match rates::derive_rates(self.history.metrics(), &TRACKED_METRICS) {
            Ok(model) => self.rates = model,
            Err(e) => warn!(error = %e, "keeping previous rates"),
        }
    }
}

#[cfg(test)]
impl Dashboard<'_> {
    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn regions(&self) -> &Regions {
        &self.regions
    }

    /// (width, height) the chart is currently rendered for
    pub fn plot_area(&self) -> (usize, usize) {
        self.plot
    }

    pub fn chart_model(&self) -> &ChartModel {
        &self.chart
    }

    pub fn rate_model(&self) -> &RateModel {
        &self.rates
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Physical frames drawn so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    use k6ctl_core::model::TestStatus;
    use k6ctl_core::rates::Rate;
    use ratatui::backend::TestBackend;

    use crate::dispatcher::Command;
    use crate::fake::FakeController;
    use crate::ui::NoticeLevel;

    /// Replays a fixed list of events, then reports nothing
    struct Script(VecDeque<InputEvent>);

    impl Script {
        fn new(events: &[InputEvent]) -> Self {
            Self(events.iter().copied().collect())
        }
    }

    impl InputSource for Script {
        fn next_event(&mut self) -> io::Result<Option<InputEvent>> {
            Ok(self.0.pop_front())
        }
    }

    fn config() -> Config {
        Config {
            // long enough that no poll becomes due during a test
            refresh_interval: Duration::from_secs(600),
            vu_step: 5,
            ..Config::default()
        }
    }

    fn terminal(w: u16, h: u16) -> Terminal<TestBackend> {
        Terminal::new(TestBackend::new(w, h)).unwrap()
    }

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buf = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[tokio::test]
    async fn test_startup_polls_and_renders() {
        let cfg = config();
        let fake = Arc::new(FakeController::demo());
        let mut term = terminal(100, 30);
        let mut d = Dashboard::new(&cfg, fake, 100, 30);

        d.start().await;
        assert_eq!(d.history().len(), 1);
        assert_eq!(d.chart_model().bars.len(), 1);

        let mut input = Script::new(&[]);
        assert_eq!(d.step(&mut term, &mut input).await.unwrap(), Flow::Continue);
        assert_eq!(d.frames(), 1);

        let text = screen(&term);
        assert!(text.contains("k6 test status"));
        assert!(text.contains("10 VU"));
        assert!(text.contains("fetched status and metrics"));
    }

    #[tokio::test]
    async fn test_run_returns_on_quit() {
        let cfg = config();
        let mut term = terminal(80, 24);
        let mut d = Dashboard::new(&cfg, Arc::new(FakeController::demo()), 80, 24);

        let mut input = Script::new(&[InputEvent::Quit]);
        d.run(&mut term, &mut input).await.unwrap();
        // "Starting..." frame only; quit is handled before the next draw
        assert_eq!(d.frames(), 1);
        assert_eq!(d.history().len(), 1);
    }

    #[tokio::test]
    async fn test_resize_applies_before_next_draw() {
        let cfg = config();
        let mut term = terminal(80, 24);
        let mut d = Dashboard::new(&cfg, Arc::new(FakeController::demo()), 80, 24);
        d.start().await;

        term.backend_mut().resize(120, 40);
        let mut input = Script::new(&[InputEvent::Resize(120, 40)]);
        d.step(&mut term, &mut input).await.unwrap();

        let expected = layout::compute(40, 120, true);
        assert_eq!(*d.regions(), expected);
        assert_eq!(d.plot_area(), expected.chart.plot_area());
        assert_eq!(d.frames(), 1);
        assert_eq!(term.backend().buffer().area.width, 120);
    }

    #[tokio::test]
    async fn test_resize_rescales_chart_to_new_plot() {
        let cfg = config();
        let mut term = terminal(30, 20);
        let mut d = Dashboard::new(&cfg, Arc::new(FakeController::demo()), 30, 20);
        d.start().await;
        for _ in 0..7 {
            d.pump_network(Instant::now() + Duration::from_secs(3600));
            d.settle().await;
        }
        let narrow = d.plot_area();
        assert_eq!(narrow.0, 6);
        assert_eq!(d.history().len(), 8);
        assert_eq!(d.chart_model().bars.len(), narrow.0);

        term.backend_mut().resize(100, 40);
        let mut input = Script::new(&[InputEvent::Resize(100, 40)]);
        d.step(&mut term, &mut input).await.unwrap();

        let (w, h) = d.plot_area();
        assert_eq!((w, h), layout::compute(40, 100, true).chart.plot_area());
        assert!(w > d.history().len());
        assert_eq!(d.chart_model().bars.len(), d.history().len());
        assert_eq!(d.chart_model(), &chart::render(d.history().vus(), w, h));
        assert!(d.chart_model().bars.iter().all(|b| b.height <= h));

        // the next poll keeps rendering at the new size
        d.pump_network(Instant::now() + Duration::from_secs(3600));
        d.settle().await;
        assert_eq!(d.history().len(), 9);
        assert_eq!(d.chart_model().bars.len(), 9);
        assert_eq!(d.chart_model(), &chart::render(d.history().vus(), w, h));

        // shrinking drops the oldest bars again
        let mut input = Script::new(&[InputEvent::Resize(30, 20)]);
        d.step(&mut term, &mut input).await.unwrap();
        assert_eq!(d.plot_area(), narrow);
        assert_eq!(d.chart_model().bars.len(), narrow.0);
        assert_eq!(d.chart_model(), &chart::render(d.history().vus(), narrow.0, narrow.1));
    }

    #[tokio::test]
    async fn test_pause_toggle_patches_then_repolls() {
        let cfg = config();
        let fake = Arc::new(FakeController::demo());
        let mut term = terminal(100, 30);
        let mut d = Dashboard::new(&cfg, fake.clone(), 100, 30);
        d.start().await;

        let mut input = Script::new(&[InputEvent::Command(Command::TogglePause)]);
        d.step(&mut term, &mut input).await.unwrap();
        d.settle().await;

        assert_eq!(fake.patches().len(), 1);
        assert!(fake.patches()[0].paused);
        assert_eq!(d.history().len(), 2);
        assert!(d.history().latest_status().unwrap().value.paused);
        assert_eq!(d.notice().unwrap().text, "pause toggle sent");
    }

    #[tokio::test]
    async fn test_vu_increase_uses_configured_step() {
        let cfg = config();
        let fake = Arc::new(FakeController::new(TestStatus::new(true, false, 10, 50)));
        let mut term = terminal(100, 30);
        let mut d = Dashboard::new(&cfg, fake.clone(), 100, 30);
        d.start().await;

        let mut input = Script::new(&[InputEvent::Command(Command::IncreaseVus)]);
        d.step(&mut term, &mut input).await.unwrap();
        d.settle().await;

        assert_eq!(fake.patches()[0].vus, 15);
        assert_eq!(d.history().vus().last().unwrap().value, 15);
    }

    #[tokio::test]
    async fn test_queued_commands_stack() {
        let cfg = config();
        let fake = Arc::new(FakeController::demo());
        let mut term = terminal(100, 30);
        let mut d = Dashboard::new(&cfg, fake.clone(), 100, 30);
        d.start().await;

        let mut input = Script::new(&[
            InputEvent::Command(Command::IncreaseVus),
            InputEvent::Command(Command::IncreaseVus),
        ]);
        // first step starts job one, second step queues behind it
        d.step(&mut term, &mut input).await.unwrap();
        d.step(&mut term, &mut input).await.unwrap();
        d.settle().await;
        d.pump_network(Instant::now());
        d.settle().await;

        let vus: Vec<i64> = fake.patches().iter().map(|p| p.vus).collect();
        assert_eq!(vus, vec![15, 20]);
    }

    #[tokio::test]
    async fn test_command_before_first_status_is_dropped() {
        let cfg = config();
        let fake = Arc::new(FakeController::demo());
        fake.go_offline(1);
        let mut term = terminal(100, 30);
        let mut d = Dashboard::new(&cfg, fake.clone(), 100, 30);
        d.start().await;
        assert!(d.history().is_empty());

        let mut input = Script::new(&[InputEvent::Command(Command::TogglePause)]);
        d.step(&mut term, &mut input).await.unwrap();

        assert!(fake.patches().is_empty());
        let notice = d.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Warn);
        assert!(notice.text.contains("no status"));
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_history() {
        let cfg = config();
        let fake = Arc::new(FakeController::demo());
        let mut term = terminal(100, 30);
        let mut d = Dashboard::new(&cfg, fake.clone(), 100, 30);
        d.start().await;
        let chart_before = d.chart_model().clone();

        fake.go_offline(2);
        d.pump_network(Instant::now() + Duration::from_secs(3600));
        d.settle().await;

        assert_eq!(d.history().len(), 1);
        assert_eq!(d.chart_model(), &chart_before);
        let notice = d.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.text.contains("connection refused"));

        let mut input = Script::new(&[]);
        d.step(&mut term, &mut input).await.unwrap();
        assert!(screen(&term).contains("connection refused"));
    }

    #[tokio::test]
    async fn test_rates_appear_after_three_polls() {
        let cfg = config();
        let mut d = Dashboard::new(&cfg, Arc::new(FakeController::demo()), 100, 30);
        d.start().await;
        assert_eq!(d.rate_model().get("iterations"), Some(Rate::Unavailable));

        for _ in 0..2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            d.pump_network(Instant::now() + Duration::from_secs(3600));
            d.settle().await;
        }
        assert_eq!(d.history().len(), 3);
        let rate = d.rate_model().get("iterations").unwrap();
        assert!(rate.per_second().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_shared_timestamp_keeps_rates_but_updates_chart() {
        let cfg = config();
        let mut d = Dashboard::new(&cfg, Arc::new(FakeController::demo()), 100, 30);
        d.start().await;
        for _ in 0..2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            d.pump_network(Instant::now() + Duration::from_secs(3600));
            d.settle().await;
        }
        let rates_before = d.rate_model().clone();
        assert!(rates_before.get("iterations").unwrap().per_second().is_some());
        let bars_before = d.chart_model().bars.len();

        // after recording, the newest sample is compared with this one
        let metrics = d.history().metrics();
        let paired = metrics[metrics.len() - 2].at;
        let snapshot = PollSnapshot {
            at: paired,
            status: TestStatus::new(true, false, 42, 50),
            metrics: metrics[metrics.len() - 1].value.clone(),
        };
        d.apply_outcome(JobOutcome::Polled(Ok(snapshot)));

        assert_eq!(d.history().len(), 4);
        assert_eq!(d.rate_model(), &rates_before);
        assert_eq!(d.chart_model().bars.len(), bars_before + 1);
        assert_eq!(d.chart_model().bars.last().unwrap().value, 42);
    }

    #[tokio::test]
    async fn test_draws_at_most_once_per_iteration() {
        let cfg = config();
        let mut term = terminal(100, 30);
        let mut d = Dashboard::new(&cfg, Arc::new(FakeController::demo()), 100, 30);
        d.start().await;

        let mut idle = Script::new(&[]);
        d.step(&mut term, &mut idle).await.unwrap();
        assert_eq!(d.frames(), 1);

        // a poll finishes while the next iteration also handles a resize
        d.pump_network(Instant::now() + Duration::from_secs(3600));
        tokio::time::sleep(Duration::from_millis(10)).await;
        let mut input = Script::new(&[InputEvent::Resize(100, 30)]);
        d.step(&mut term, &mut input).await.unwrap();
        assert_eq!(d.frames(), 2);
        assert_eq!(d.history().len(), 2);
        assert!(!screen(&term).contains("(2 samples)"));

        // the collected poll is drawn on the following iteration
        d.step(&mut term, &mut idle).await.unwrap();
        assert_eq!(d.frames(), 3);
        assert!(screen(&term).contains("(2 samples)"));

        // nothing changed: no further frames
        d.step(&mut term, &mut idle).await.unwrap();
        d.step(&mut term, &mut idle).await.unwrap();
        assert_eq!(d.frames(), 3);
    }

    #[tokio::test]
    async fn test_tiny_terminal_does_not_panic() {
        let cfg = config();
        for (w, h) in [(1u16, 1u16), (3, 3), (10, 6), (20, 12)] {
            let mut term = terminal(w, h);
            let mut d = Dashboard::new(&cfg, Arc::new(FakeController::demo()), w, h);
            d.start().await;
            let mut input = Script::new(&[InputEvent::Resize(w, h)]);
            d.step(&mut term, &mut input).await.unwrap();
            assert!(d.chart_model().bars.len() <= d.plot_area().0);
        }
    }
}
