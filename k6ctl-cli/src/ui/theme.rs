//! UI Theme Module - color palette and style helpers
//!
//! Provides the dashboard's palette with:
//! - Palette tokens (not hard-coded colors)
//! - StyleKit helpers for the panel elements
//! - Green-on-black terminal defaults

use ratatui::style::{Color, Modifier, Style};

/// Color palette tokens for the theme
#[derive(Clone, Debug)]
pub struct Palette {
    /// Panel background
    pub bg: Color,
    /// Primary text, bars and frames
    pub text: Color,
    /// Secondary text (axis labels, counts)
    pub text_dim: Color,
    /// Panel border color
    pub border: Color,
    /// Accent for panel titles
    pub accent: Color,
    /// Warning messages
    pub warn: Color,
    /// Error messages
    pub error: Color,
    /// Key hint text
    pub key_hint: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self::classic()
    }
}

impl Palette {
    /// Green on black, the look of a classic terminal monitor
    pub fn classic() -> Self {
        Self {
            bg: Color::Black,
            text: Color::Green,
            text_dim: Color::Rgb(90, 160, 90),
            border: Color::Green,
            accent: Color::LightGreen,
            warn: Color::Yellow,
            error: Color::LightRed,
            key_hint: Color::Rgb(206, 145, 120),
        }
    }
}

/// Theme configuration
#[derive(Clone, Debug, Default)]
pub struct Theme {
    pub palette: Palette,
}

impl Theme {
    // ========== StyleKit Helper Functions ==========

    /// Base style for panel content
    pub fn panel_style(&self) -> Style {
        Style::default().fg(self.palette.text).bg(self.palette.bg)
    }

    /// Style for panel borders
    pub fn border_style(&self) -> Style {
        Style::default().fg(self.palette.border).bg(self.palette.bg)
    }

    /// Style for panel titles
    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.palette.accent)
            .add_modifier(Modifier::BOLD)
    }

    /// Live values, drawn in reverse video
    pub fn value_style(&self) -> Style {
        self.panel_style().add_modifier(Modifier::REVERSED)
    }

    /// Style for dimmed text
    pub fn text_dim_style(&self) -> Style {
        Style::default().fg(self.palette.text_dim).bg(self.palette.bg)
    }

    /// Style for key hints
    pub fn key_hint_style(&self) -> Style {
        Style::default().fg(self.palette.key_hint).bg(self.palette.bg)
    }

    /// Style for warning text
    pub fn warn_style(&self) -> Style {
        Style::default().fg(self.palette.warn).bg(self.palette.bg)
    }

    /// Style for error text
    pub fn error_style(&self) -> Style {
        Style::default()
            .fg(self.palette.error)
            .bg(self.palette.bg)
            .add_modifier(Modifier::BOLD)
    }
}

/// Global theme instance
static DEFAULT_THEME: std::sync::OnceLock<Theme> = std::sync::OnceLock::new();

/// Get the default theme
pub fn theme() -> &'static Theme {
    DEFAULT_THEME.get_or_init(Theme::default)
}

/// Convenience re-exports for common use cases
pub mod styles {
    use super::*;

    pub fn panel() -> Style {
        theme().panel_style()
    }

    pub fn border() -> Style {
        theme().border_style()
    }

    pub fn title() -> Style {
        theme().title_style()
    }

    pub fn value() -> Style {
        theme().value_style()
    }

    pub fn text_dim() -> Style {
        theme().text_dim_style()
    }

    pub fn key_hint() -> Style {
        theme().key_hint_style()
    }

    pub fn warn() -> Style {
        theme().warn_style()
    }

    pub fn error() -> Style {
        theme().error_style()
    }
}
