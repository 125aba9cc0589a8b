//! VU chart scaling.
//!
//! Turns the tail of the VU series into a renderable bar model. The scale
//! is recomputed from scratch on every call, so rendering the same window
//! into the same area always yields the same model.

use crate::model::VuSample;

/// Time format used for the X axis labels.
pub const TIME_LABEL_FORMAT: &str = "%H:%M:%S";

#[derive(Clone, Debug, PartialEq)]
pub struct Bar {
    /// Raw sample value (negative input is reported as 0)
    pub value: i64,
    /// Rows filled, in `0..=plot height`
    pub height: usize,
    /// Bar sits in the first slot of the window
    pub is_first: bool,
    /// Bar sits in the last slot, i.e. the window is full
    pub is_last: bool,
    /// Bar sits in the middle slot
    pub is_mid: bool,
    /// `HH:MM:SS`, only on bars in the first, middle and last slot
    pub time_label: Option<String>,
    /// `"<n> VU"`, only on the most recent bar
    pub value_label: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChartModel {
    pub y_max: i64,
    pub y_ticks: [f64; 3],
    /// Oldest to newest
    pub bars: Vec<Bar>,
}

impl ChartModel {
    /// An empty model means "nothing to draw"
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Upper bound of the Y axis for a window whose largest value is `max_val`.
///
/// Rounds down to the leading digit of `max_val` and adds 20% headroom,
/// truncated to an integer. For values that are not a multiple of their
/// magnitude (e.g. 15 -> 12) the bound ends up below `max_val`; bars are
/// clamped to the plot in that case. Never returns less than 1.
pub fn nice_y_max(max_val: i64) -> i64 {
    if max_val <= 0 {
        return 1;
    }
    let mut magnitude: i64 = 1;
    while magnitude <= max_val / 10 {
        magnitude *= 10;
    }
    let base = magnitude * (max_val / magnitude);
    (base * 6 / 5).max(1)
}

/// Build the chart model for the last `width` samples of `vus` plotted
/// into a `width` x `height` area.
pub fn render(vus: &[VuSample], width: usize, height: usize) -> ChartModel {
    if vus.is_empty() || width == 0 || height == 0 {
        return ChartModel::default();
    }

    let window = &vus[vus.len().saturating_sub(width)..];
    let max_val = window.iter().map(|s| s.value.max(0)).max().unwrap_or(0);
    let y_max = nice_y_max(max_val);

    // Label slots are fixed relative to the plot width so labels stay
    // spread out while the window is still filling up.
    let last_slot = width - 1;
    let mid_slot = last_slot / 2;
    let newest = window.len() - 1;

    let bars = window
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let value = sample.value.max(0);
            let scaled = (height as f64 * value as f64 / y_max as f64).round();
            let bar_height = (scaled.max(0.0) as usize).min(height);

            let is_first = i == 0;
            let is_last = i == last_slot;
            let is_mid = i == mid_slot;
            let time_label = (is_first || is_last || is_mid)
                .then(|| sample.at.format(TIME_LABEL_FORMAT).to_string());
            let value_label = (i == newest).then(|| format!("{} VU", value));

            Bar {
                value,
                height: bar_height,
                is_first,
                is_last,
                is_mid,
                time_label,
                value_label,
            }
        })
        .collect();

    ChartModel {
        y_max,
        y_ticks: [0.0, y_max as f64 / 2.0, y_max as f64],
        bars,
    }
}
