//! Screen partitioning.
//!
//! `compute` is a pure function of the terminal size. The dashboard calls
//! it again on every resize and never mutates regions in place.

/// Height of the message strip along the bottom edge.
pub const DEBUG_HEIGHT: i32 = 5;

/// Columns of the chart region not used for bars (frame, Y labels, value label overhang).
pub const CHART_MARGIN_X: i32 = 12;
/// Rows of the chart region not used for bars (frame, caption, value label, X labels).
pub const CHART_MARGIN_Y: i32 = 7;

/// A rectangle in character cells. Signed so a terminal too small for the
/// layout shows up as a non-positive size instead of wrapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Region {
    pub top: i32,
    pub left: i32,
    pub height: i32,
    pub width: i32,
}

impl Region {
    pub fn new(top: i32, left: i32, height: i32, width: i32) -> Self {
        Self {
            top,
            left,
            height,
            width,
        }
    }

    /// Regions that fail this render nothing
    pub fn is_drawable(&self) -> bool {
        self.top >= 0 && self.left >= 0 && self.height > 0 && self.width > 0
    }

    /// Bar plotting area inside a chart region, as (width, height).
    /// Zero when the region is too small to hold a chart.
    pub fn plot_area(&self) -> (usize, usize) {
        if !self.is_drawable() {
            return (0, 0);
        }
        let w = (self.width - CHART_MARGIN_X).max(0) as usize;
        let h = (self.height - CHART_MARGIN_Y).max(0) as usize;
        (w, h)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Regions {
    pub status: Region,
    pub metrics: Region,
    pub chart: Region,
    pub debug: Option<Region>,
}

/// Partition a `height` x `width` terminal.
///
/// The chart takes the right 60% at full body height, status and metrics
/// stack in the left 40%, and the optional debug strip spans the bottom.
pub fn compute(height: u16, width: u16, with_debug: bool) -> Regions {
    let h = i32::from(height);
    let w = i32::from(width);

    let strip = if with_debug { DEBUG_HEIGHT } else { 0 };
    let body = h - strip;

    let left_width = w * 2 / 5;
    let chart_left = (w * 4 + 5) / 10;
    let chart_width = w * 3 / 5;

    let status_height = body / 2;

    Regions {
        status: Region::new(0, 0, status_height, left_width),
        metrics: Region::new(status_height, 0, body - status_height, left_width),
        chart: Region::new(0, chart_left, body, chart_width),
        debug: with_debug.then(|| Region::new(h - DEBUG_HEIGHT, 0, DEBUG_HEIGHT, w)),
    }
}
