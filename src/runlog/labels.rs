//! Human-readable status labels used in execution logs.
//!
//! Labels are written verbatim and read back by substring matching, so a
//! hand-edited log with `Success` or `✅` alone still resolves.

use crate::core::{RunStatus, StepStatus};

impl StepStatus {
    /// Log label for this status.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "⏳ Pending",
            Self::Success => "✅ Success",
            Self::Error => "❌ Error",
            Self::Timeout => "⏰ Timeout",
            Self::Skipped => "⏭️ Skipped",
        }
    }

    /// Fold a label back to a status. Unrecognized text yields `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        const MARKERS: &[(&str, &str, StepStatus)] = &[
            ("✅", "success", StepStatus::Success),
            ("❌", "error", StepStatus::Error),
            ("⏭", "skipped", StepStatus::Skipped),
            ("⏰", "timeout", StepStatus::Timeout),
            ("⏳", "pending", StepStatus::Pending),
        ];
        match_label(label, MARKERS)
    }
}

impl RunStatus {
    /// Log label for this status.
    pub fn label(self) -> &'static str {
        match self {
            Self::Completed => "✅ Completed Successfully",
            Self::Failed => "❌ Failed",
            Self::Interrupted => "⚠️ Interrupted",
        }
    }

    /// Fold a label back to a status. Unrecognized text yields `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        const MARKERS: &[(&str, &str, RunStatus)] = &[
            ("✅", "completed", RunStatus::Completed),
            ("❌", "failed", RunStatus::Failed),
            ("⚠", "interrupted", RunStatus::Interrupted),
        ];
        match_label(label, MARKERS)
    }
}

fn match_label<T: Copy>(label: &str, markers: &[(&str, &str, T)]) -> Option<T> {
    let lower = label.trim().to_lowercase();
    markers
        .iter()
        .find(|(emoji, word, _)| lower.contains(emoji) || lower.contains(word))
        .map(|(_, _, status)| *status)
}
