//! Line layout and scrolling for the step and log views.
//!
//! Both views are laid out as plain lines tagged with a [`LineKind`]. The
//! renderer styles lines by kind; scrolling works on the same lines, so the
//! offset of each step is known exactly.

use crate::core::StepStatus;
use crate::runlog::{LogMetadata, LogStep};

use super::session::ExecuteSession;

/// Output lines shown per step before truncating.
const OUTPUT_PREVIEW_LINES: usize = 8;

/// Error lines shown per step before truncating.
const ERROR_PREVIEW_LINES: usize = 5;

/// What a laid-out line shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Title,
    Divider,
    Meta,
    Progress,
    ProgressBar,
    StepHeader { current: bool },
    Badge { status: Option<StepStatus>, current: bool },
    Description,
    Label,
    Command,
    Output,
    ErrorLabel,
    Error,
    Separator,
    Blank,
}

/// A single laid-out line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutLine {
    pub kind: LineKind,
    pub text: String,
}

/// Laid-out content plus the first line of each step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    pub lines: Vec<LayoutLine>,
    pub step_starts: Vec<usize>,
}

impl Layout {
    fn push(&mut self, kind: LineKind, text: impl Into<String>) {
        self.lines.push(LayoutLine { kind, text: text.into() });
    }

    fn push_wrapped(&mut self, kind: LineKind, indent: &str, text: &str, width: usize) {
        let avail = width.saturating_sub(indent.len()).max(10);
        for line in wrap(text, avail) {
            self.push(kind, format!("{indent}{line}"));
        }
    }

    fn blank(&mut self) {
        self.push(LineKind::Blank, "");
    }

    fn mark_step(&mut self) {
        self.step_starts.push(self.lines.len());
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether there are no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// First line of step `index` (0 when out of range).
    pub fn step_start(&self, index: usize) -> usize {
        self.step_starts.get(index).copied().unwrap_or(0)
    }
}

/// Scroll state of a view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub offset: usize,
    pub height: usize,
}

impl Viewport {
    pub fn new(height: usize) -> Self {
        Self { offset: 0, height }
    }

    /// Largest offset that still fills the view.
    pub fn max_offset(&self, total: usize) -> usize {
        total.saturating_sub(self.height)
    }

    /// Scroll so that a step starting at `line` is in view, with a little
    /// context above it.
    pub fn follow(&mut self, line: usize, total: usize) {
        self.offset = line.saturating_sub(self.height / 4).min(self.max_offset(total));
    }

    /// Scroll by `delta` lines.
    pub fn scroll_by(&mut self, delta: isize, total: usize) {
        let offset = self.offset.saturating_add_signed(delta);
        self.offset = offset.min(self.max_offset(total));
    }

    /// Half a page, at least one line.
    pub fn half_page(&self) -> isize {
        isize::try_from((self.height / 2).max(1)).unwrap_or(1)
    }

    /// A full page, at least one line.
    pub fn page(&self) -> isize {
        isize::try_from(self.height.max(1)).unwrap_or(1)
    }
}

/// Lay out the step view of a session.
pub fn layout_session(session: &ExecuteSession, width: usize) -> Layout {
    let mut layout = Layout::default();

    layout.push(LineKind::Title, session.document.display_title());
    layout.push(LineKind::Divider, "─".repeat(width.saturating_sub(4)));
    layout.blank();
    push_progress(&mut layout, session.completed_count(), session.steps.len(), width);

    for (i, step) in session.steps.iter().enumerate() {
        let current = i == session.current;
        layout.mark_step();

        let marker = if current { "▶ " } else { "  " };
        let title = if step.title.is_empty() { "Untitled Step" } else { &step.title };
        layout.push(LineKind::StepHeader { current }, format!("{marker}Step {}: {title}", i + 1));
        layout.push(
            LineKind::Badge { status: Some(step.status), current },
            badge_text(Some(step.status), current),
        );
        layout.blank();

        if !step.description.is_empty() {
            layout.push_wrapped(LineKind::Description, "    ", &step.description, width);
            layout.blank();
        }

        if !step.command.is_empty() {
            layout.push(LineKind::Label, "    Command:");
            layout.push_wrapped(LineKind::Command, "      ", &format!("$ {}", step.command), width);
            layout.blank();
        }

        if !step.output.is_empty() {
            layout.push(LineKind::Label, "    Output:");
            let output = truncate_lines(&step.output, OUTPUT_PREVIEW_LINES);
            layout.push_wrapped(LineKind::Output, "      ", &output, width);
            layout.blank();
        }

        if let Some(error) = step.error.as_deref().filter(|e| !e.is_empty()) {
            layout.push(LineKind::ErrorLabel, "    Error:");
            let error = truncate_lines(error, ERROR_PREVIEW_LINES);
            layout.push_wrapped(LineKind::Error, "      ", &error, width);
            layout.blank();
        }

        if i + 1 < session.steps.len() {
            layout.push(LineKind::Separator, "─".repeat(width.saturating_sub(4)));
            layout.blank();
        }
    }

    layout
}

/// Lay out a parsed log for viewing.
pub fn layout_log(meta: &LogMetadata, steps: &[LogStep], current: usize, width: usize) -> Layout {
    let mut layout = Layout::default();

    layout.push(LineKind::Title, format!("{} (Logs)", meta.sop_name()));
    layout.push(LineKind::Divider, "─".repeat(width.saturating_sub(4)));
    layout.blank();

    if !meta.executed_by.is_empty() {
        layout.push(LineKind::Meta, format!("    Executed by: {}", meta.executed_by));
    }
    if !meta.started_at.is_empty() {
        layout.push(LineKind::Meta, format!("    Started: {}", meta.started_at));
    }
    if !meta.status.is_empty() {
        layout.push(LineKind::Meta, format!("    Status: {}", meta.status));
    }
    layout.blank();

    let completed = steps.iter().filter(|s| s.status() == Some(StepStatus::Success)).count();
    push_progress(&mut layout, completed, steps.len(), width);

    for (i, step) in steps.iter().enumerate() {
        let is_current = i == current;
        layout.mark_step();

        let marker = if is_current { "▶ " } else { "  " };
        layout.push(
            LineKind::StepHeader { current: is_current },
            format!("{marker}Step {}: {}", step.step_id, step.title),
        );

        let status = step.status();
        let mut badge = match status {
            Some(_) => badge_text(status, false),
            None => format!("  ? {}", step.result_status),
        };
        if is_current {
            badge.push_str(" ◀ VIEWING");
        }
        layout.push(LineKind::Badge { status, current: false }, badge);
        layout.blank();

        if !step.command.is_empty() {
            layout.push_wrapped(LineKind::Command, "      ", &format!("$ {}", step.command), width);
            layout.blank();
        }

        if !step.executed_at.is_empty() {
            layout.push(LineKind::Meta, format!("    Executed: {}", step.executed_at));
            layout.blank();
        }

        if !step.output.is_empty() {
            layout.push(LineKind::Label, "    Output:");
            let output = truncate_lines(&step.output, OUTPUT_PREVIEW_LINES + 2);
            layout.push_wrapped(LineKind::Output, "      ", &output, width);
            layout.blank();
        }

        if i + 1 < steps.len() {
            layout.push(LineKind::Separator, "─".repeat(width.saturating_sub(4)));
            layout.blank();
        }
    }

    layout
}

/// Badge text for a step status.
pub fn badge_text(status: Option<StepStatus>, current: bool) -> String {
    let badge = match status {
        Some(StepStatus::Success) => "✓ DONE",
        Some(StepStatus::Error) => "✗ ERROR",
        Some(StepStatus::Skipped) => "⊘ SKIPPED",
        Some(StepStatus::Timeout) => "⏰ TIMEOUT",
        Some(StepStatus::Pending) | None if current => "▶ CURRENT",
        Some(StepStatus::Pending) | None => "○ PENDING",
    };
    format!("  {badge}")
}

fn push_progress(layout: &mut Layout, completed: usize, total: usize, width: usize) {
    let percent = if total == 0 { 0 } else { completed * 100 / total };
    let bar_width = if width < 80 { width.saturating_sub(40).max(10) } else { 40 };
    let filled = percent * bar_width / 100;

    layout.push(LineKind::Progress, format!("Progress: {completed}/{total} ({percent}%)"));
    layout.push(
        LineKind::ProgressBar,
        format!("{}{}", "█".repeat(filled), "░".repeat(bar_width - filled)),
    );
    layout.blank();
}

/// Keep the first `max` lines, noting how many were dropped.
fn truncate_lines(text: &str, max: usize) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() <= max {
        return text.to_string();
    }
    let mut kept = lines[..max].join("\n");
    kept.push_str(&format!("\n... ({} more lines)", lines.len() - max));
    kept
}

/// Hard-wrap each line of `text` to `width` characters.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for line in text.split('\n') {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            out.push(String::new());
            continue;
        }
        out.extend(chars.chunks(width).map(|chunk| chunk.iter().collect::<String>()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sop::parse_sop_str;

    fn session(steps: usize) -> ExecuteSession {
        let mut text = String::from("# Many\n\n");
        for i in 0..steps {
            text.push_str(&format!("Step {i}\n\n```bash\necho {i}\n```\n\n"));
        }
        ExecuteSession::new(parse_sop_str(&text, "/srv/sops/many.md"))
    }

    #[test]
    fn test_step_starts_are_increasing() {
        let layout = layout_session(&session(4), 80);
        assert_eq!(layout.step_starts.len(), 4);
        assert!(layout.step_starts.windows(2).all(|w| w[0] < w[1]));
        assert!(layout.lines[layout.step_start(0)].text.contains("Step 1: echo"));
    }

    #[test]
    fn test_follow_clamps_to_content() {
        let layout = layout_session(&session(10), 80);
        let total = layout.len();
        let mut viewport = Viewport::new(20);

        viewport.follow(layout.step_start(0), total);
        assert_eq!(viewport.offset, 0);

        viewport.follow(layout.step_start(9), total);
        assert!(viewport.offset <= total - 20);
        assert!(viewport.offset <= layout.step_start(9));
        assert!(layout.step_start(9) < viewport.offset + viewport.height);
    }

    #[test]
    fn test_short_content_never_scrolls() {
        let mut viewport = Viewport::new(100);
        viewport.follow(30, 40);
        assert_eq!(viewport.offset, 0);
        viewport.scroll_by(10, 40);
        assert_eq!(viewport.offset, 0);
    }

    #[test]
    fn test_scroll_by_saturates() {
        let mut viewport = Viewport::new(10);
        viewport.scroll_by(-5, 50);
        assert_eq!(viewport.offset, 0);
        viewport.scroll_by(100, 50);
        assert_eq!(viewport.offset, 40);
    }

    #[test]
    fn test_output_is_truncated() {
        let mut s = session(1);
        s.steps[0].output = (1..=20).map(|n| n.to_string()).collect::<Vec<_>>().join("\n");
        let layout = layout_session(&s, 80);
        assert!(layout.lines.iter().any(|l| l.text.contains("... (12 more lines)")));
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("abcdef", 4), ["abcd", "ef"]);
        assert_eq!(wrap("a\n\nb", 4), ["a", "", "b"]);
    }

    #[test]
    fn test_badges() {
        assert_eq!(badge_text(Some(StepStatus::Pending), true), "  ▶ CURRENT");
        assert_eq!(badge_text(Some(StepStatus::Pending), false), "  ○ PENDING");
        assert_eq!(badge_text(Some(StepStatus::Timeout), true), "  ⏰ TIMEOUT");
    }
}
