//! Dashboard rendering.
//!
//! Everything here is a pure function of a [`View`]; the dashboard loop
//! decides when to draw and owns all state.

pub mod chart;
pub mod panels;
pub mod theme;

pub use theme::styles;

use chrono::Local;
use ratatui::Frame;
use ratatui::layout::Rect;

use k6ctl_core::chart::ChartModel;
use k6ctl_core::history::History;
use k6ctl_core::layout::{Region, Regions};
use k6ctl_core::model::Timestamp;
use k6ctl_core::rates::RateModel;

use chart::VuChart;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

/// The one-line message shown in the debug strip
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub at: Timestamp,
}

impl Notice {
    pub fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            at: Local::now(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, text)
    }

    pub fn warn(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warn, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, text)
    }
}

/// Borrowed snapshot of everything one frame needs
pub struct View<'a> {
    pub regions: &'a Regions,
    pub history: &'a History,
    pub chart: &'a ChartModel,
    /// (width, height) the chart model was rendered for
    pub plot: (usize, usize),
    pub rates: &'a RateModel,
    pub notice: Option<&'a Notice>,
    /// Commands waiting behind the in-flight job
    pub pending: usize,
}

/// Terminal rectangle for `region`, clipped to `bounds`. `None` when the
/// region is degenerate or lies entirely off screen.
pub fn region_rect(region: &Region, bounds: Rect) -> Option<Rect> {
    if !region.is_drawable() {
        return None;
    }
    let rect = Rect::new(
        u16::try_from(region.left).ok()?,
        u16::try_from(region.top).ok()?,
        u16::try_from(region.width).ok()?,
        u16::try_from(region.height).ok()?,
    );
    let clipped = rect.intersection(bounds);
    (clipped.width > 0 && clipped.height > 0).then_some(clipped)
}

pub fn draw(f: &mut Frame, view: &View) {
    let bounds = f.area();
    let regions = view.regions;

    // With no strip the latest notice goes into the status panel title
    let title_notice = if regions.debug.is_none() {
        view.notice
    } else {
        None
    };

    if let Some(area) = region_rect(&regions.status, bounds) {
        f.render_widget(panels::status_panel(view.history, title_notice), area);
    }
    if let Some(area) = region_rect(&regions.metrics, bounds) {
        f.render_widget(panels::metrics_panel(view.history, view.rates), area);
    }
    if let Some(area) = region_rect(&regions.chart, bounds) {
        f.render_widget(VuChart::new(view.chart, view.plot), area);
    }
    if let Some(area) = regions.debug.as_ref().and_then(|r| region_rect(r, bounds)) {
        f.render_widget(
            panels::debug_panel(view.history, view.notice, view.pending),
            area,
        );
    }
}
