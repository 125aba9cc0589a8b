//! VU bar chart widget.
//!
//! Draws a `ChartModel` inside a bordered box: `-` ticks with labels on the
//! left, `#` bars right-aligned, `|` ticks with times along the bottom and
//! the latest value in reverse video above the newest bar.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Widget};

use k6ctl_core::chart::ChartModel;

use super::styles;

/// Leading columns before the first bar slot
const BAR_OFFSET_X: usize = 7;
/// Rows above the plot (border, caption, value label, connector)
const PLOT_TOP: usize = 4;

pub struct VuChart<'a> {
    model: &'a ChartModel,
    plot_width: usize,
    plot_height: usize,
}

impl<'a> VuChart<'a> {
    /// `plot` is the (width, height) the model was rendered for
    pub fn new(model: &'a ChartModel, plot: (usize, usize)) -> Self {
        Self {
            model,
            plot_width: plot.0,
            plot_height: plot.1,
        }
    }
}

/// Write `text` at (`col`, `row`) relative to `area`, clipped to it
fn put(buf: &mut Buffer, area: Rect, col: usize, row: usize, text: &str, style: Style) {
    let (Ok(col), Ok(row)) = (u16::try_from(col), u16::try_from(row)) else {
        return;
    };
    if col >= area.width || row >= area.height {
        return;
    }
    let max_width = usize::from(area.width - col);
    buf.set_stringn(area.x + col, area.y + row, text, max_width, style);
}

impl Widget for VuChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border())
            .style(styles::panel())
            .render(area, buf);

        let model = self.model;
        let (cw, ch) = (self.plot_width, self.plot_height);
        if model.is_empty() || cw == 0 || ch == 0 {
            return;
        }

        let height = usize::from(area.height);
        put(buf, area, 2, 1, "VU", styles::title());

        // Y axis: 0, half, max from the bottom up
        for (i, tick) in model.y_ticks.iter().enumerate() {
            let ypos = PLOT_TOP - 1 + ch - ((ch as f64 / 2.0) * i as f64) as usize;
            let label = (*tick as i64).to_string();
            let col = 3usize.saturating_sub(label.len() / 2);
            put(buf, area, col, ypos, &label, styles::text_dim());
            put(buf, area, 0, ypos, "-", styles::border());
        }

        let count = model.bars.len();
        for (i, bar) in model.bars.iter().enumerate() {
            let pos = BAR_OFFSET_X + cw - count + i;

            let top = PLOT_TOP + ch - bar.height;
            for row in top..PLOT_TOP + ch {
                put(buf, area, pos, row, "#", styles::panel());
            }

            if let Some(time) = &bar.time_label {
                put(buf, area, pos, height.saturating_sub(2), "|", styles::text_dim());
                put(
                    buf,
                    area,
                    pos.saturating_sub(3),
                    height.saturating_sub(1),
                    time,
                    styles::text_dim(),
                );
            }

            if let Some(label) = &bar.value_label {
                let col = pos.saturating_sub(label.len() / 2);
                put(buf, area, col, top - 3, label, styles::value());
                put(buf, area, pos, top - 2, "|", styles::panel());
            }
        }
    }
}
