//! Color theme for the TUI.

use ratatui::style::{Color, Modifier, Style};

use crate::core::StepStatus;

/// Colors used by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Headers, current step, selected items
    pub primary: Color,
    /// Commands
    pub secondary: Color,
    /// Labels and the current-step badge
    pub accent: Color,
    /// Main text color
    pub text: Color,
    /// Descriptions, metadata
    pub text_dim: Color,
    /// Hints, pending badges
    pub text_muted: Color,
    /// Selected list row background
    pub selected_bg: Color,
    /// Borders and dividers
    pub border: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color::Rgb(99, 102, 241),     // Indigo
            secondary: Color::Rgb(125, 211, 252),  // Sky
            accent: Color::Rgb(251, 146, 60),      // Orange
            text: Color::White,
            text_dim: Color::Rgb(156, 163, 175),   // Gray-400
            text_muted: Color::Rgb(107, 114, 128), // Gray-500
            selected_bg: Color::Rgb(55, 65, 81),   // Gray-700
            border: Color::Rgb(75, 85, 99),        // Gray-600
            success: Color::Rgb(34, 197, 94),      // Green
            warning: Color::Rgb(234, 179, 8),      // Yellow
            error: Color::Rgb(239, 68, 68),        // Red
        }
    }
}

impl Theme {
    /// Badge style for a step status.
    pub fn badge(&self, status: Option<StepStatus>, current: bool) -> Style {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        match status {
            Some(StepStatus::Success) => bold.fg(self.success),
            Some(StepStatus::Error) => bold.fg(self.error),
            Some(StepStatus::Skipped | StepStatus::Timeout) => bold.fg(self.warning),
            Some(StepStatus::Pending) | None if current => bold.fg(self.accent),
            Some(StepStatus::Pending) | None => Style::default().fg(self.text_muted),
        }
    }
}
