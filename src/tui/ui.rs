//! UI rendering for the TUI.
//!
//! The step and log views come pre-laid-out from [`crate::app`]; this module
//! only styles the visible window of lines.

use std::path::Path;

use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::theme::Theme;
use crate::app::{layout_log, layout_session, App, DirList, LayoutLine, LineKind, Mode};

const BROWSE_HELP: &str = "↑↓ nav · ←/bs back · enter select · h home · l logs · q quit";
const EXECUTE_HELP: &str = "↑↓ nav · enter run · e edit · s skip · l logs · q back";
const EDIT_HELP: &str = "enter save · esc cancel";
const LOG_LIST_HELP: &str = "↑↓ nav · ←/bs back · enter select · q back";
const LOG_VIEW_HELP: &str = "↑↓ nav · q back";

/// Draw the main UI.
pub fn draw(frame: &mut Frame, app: &App, theme: &Theme) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(3),    // Content
            Constraint::Length(1), // Status
            Constraint::Length(1), // Help
        ])
        .split(area);

    draw_header(frame, app, theme, chunks[0]);

    match app.mode {
        Mode::Browse => {
            let title = path_context("SOPs", &app.browser.dir, &app.sop_root);
            draw_file_list(frame, &app.browser, &title, theme, chunks[1]);
        }
        Mode::Execute => draw_step_view(frame, app, theme, chunks[1]),
        Mode::Edit => draw_edit_view(frame, app, theme, chunks[1]),
        Mode::Logs => match &app.logs.viewing {
            Some(view) => {
                let layout = layout_log(&view.metadata, &view.steps, view.current, app.width);
                let title = format!(" {} ", view.metadata.sop_name());
                draw_lines(frame, &layout.lines, view.viewport.offset, &title, theme, chunks[1]);
            }
            None => {
                let title = path_context("Logs", &app.logs.list.dir, &app.log_root);
                draw_file_list(frame, &app.logs.list, &title, theme, chunks[1]);
            }
        },
    }

    draw_status_bar(frame, app, theme, chunks[2]);
    draw_help_bar(frame, app, theme, chunks[3]);
}

fn draw_header(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let context = match app.mode {
        Mode::Execute | Mode::Edit => app
            .session
            .as_ref()
            .map(|s| s.document.display_title())
            .unwrap_or_default(),
        Mode::Browse | Mode::Logs => String::new(),
    };

    let mut spans = vec![
        Span::styled(" Opsy", Style::default().fg(theme.primary).add_modifier(Modifier::BOLD)),
        Span::styled(format!(" - {}", app.mode.label()), Style::default().fg(theme.text)),
    ];
    if !context.is_empty() {
        spans.push(Span::styled(format!("  {context}"), Style::default().fg(theme.text_dim)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Title for a listing: `label` plus the directory relative to its root.
fn path_context(label: &str, dir: &Path, root: &Path) -> String {
    match dir.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => format!(" {label} "),
        Ok(rel) => format!(" {label}: /{} ", rel.display()),
        Err(_) => format!(" {label}: {} ", dir.display()),
    }
}

fn draw_file_list(frame: &mut Frame, list: &DirList, title: &str, theme: &Theme, area: Rect) {
    let items: Vec<ListItem> = list
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let is_selected = i == list.selected;
            let (icon, color) = if entry.is_dir {
                ("▸ ", if is_selected { theme.primary } else { theme.accent })
            } else {
                ("  ", if is_selected { theme.text } else { theme.text_dim })
            };

            let mut name_style = Style::default().fg(color);
            let mut desc_style = Style::default().fg(theme.text_muted);
            if is_selected {
                name_style = name_style.add_modifier(Modifier::BOLD).bg(theme.selected_bg);
                desc_style = desc_style.fg(theme.text_dim).bg(theme.selected_bg);
            }

            ListItem::new(Line::from(vec![
                Span::styled(icon, Style::default().fg(color)),
                Span::styled(entry.name.as_str(), name_style),
                Span::styled("  ", Style::default()),
                Span::styled(entry.description.as_str(), desc_style),
            ]))
        })
        .collect();

    let count = if list.entries.is_empty() {
        " empty ".to_string()
    } else {
        format!(" {}/{} ", list.selected + 1, list.entries.len())
    };

    let widget = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border))
                .title(title.to_string())
                .title_style(Style::default().fg(theme.secondary).add_modifier(Modifier::BOLD))
                .title_bottom(Line::from(count).right_aligned()),
        )
        .highlight_style(Style::default().bg(theme.selected_bg));

    let mut state = ListState::default().with_selected(Some(list.selected));
    frame.render_stateful_widget(widget, area, &mut state);
}

fn draw_step_view(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let Some(session) = &app.session else {
        frame.render_widget(Paragraph::new("Loading...").block(content_block("", theme)), area);
        return;
    };

    let layout = layout_session(session, app.width);
    draw_lines(frame, &layout.lines, app.viewport.offset, " Steps ", theme, area);
}

fn draw_edit_view(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let (index, total) = app
        .session
        .as_ref()
        .map_or((0, 0), |s| (s.current + 1, s.steps.len()));

    let prompt = "> ";
    let lines = vec![
        Line::from(Span::styled(
            format!("Editing Step {index}/{total}"),
            Style::default().fg(theme.primary).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(prompt, Style::default().fg(theme.accent)),
            Span::styled(app.editor.value(), Style::default().fg(theme.secondary)),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(content_block(" Edit command ", theme)), area);

    let column = prompt.chars().count() + app.editor.cursor();
    let x = area.x.saturating_add(1).saturating_add(u16::try_from(column).unwrap_or(u16::MAX));
    let y = area.y.saturating_add(3);
    if x < area.right() && y < area.bottom() {
        frame.set_cursor_position(Position::new(x, y));
    }
}

fn draw_lines(
    frame: &mut Frame,
    lines: &[LayoutLine],
    offset: usize,
    title: &str,
    theme: &Theme,
    area: Rect,
) {
    let height = usize::from(area.height.saturating_sub(2));
    let visible: Vec<Line> = lines
        .iter()
        .skip(offset)
        .take(height)
        .map(|line| styled_line(line, theme))
        .collect();

    frame.render_widget(Paragraph::new(visible).block(content_block(title, theme)), area);
}

fn content_block<'a>(title: &str, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .title(title.to_string())
        .title_style(Style::default().fg(theme.secondary).add_modifier(Modifier::BOLD))
}

fn styled_line<'a>(line: &'a LayoutLine, theme: &Theme) -> Line<'a> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let style = match line.kind {
        LineKind::Title => bold.fg(theme.primary),
        LineKind::Divider | LineKind::Separator => Style::default().fg(theme.border),
        LineKind::Meta | LineKind::Description => Style::default().fg(theme.text_dim),
        LineKind::Progress => bold.fg(theme.success),
        LineKind::ProgressBar => Style::default().fg(theme.success),
        LineKind::StepHeader { current: true } => bold.fg(theme.primary),
        LineKind::StepHeader { current: false } => bold.fg(theme.text),
        LineKind::Badge { status, current } => theme.badge(status, current),
        LineKind::Label => bold.fg(theme.accent),
        LineKind::Command => Style::default().fg(theme.secondary),
        LineKind::Output => Style::default().fg(theme.text),
        LineKind::ErrorLabel => bold.fg(theme.error),
        LineKind::Error => Style::default().fg(theme.error),
        LineKind::Blank => Style::default(),
    };

    let rendered = Line::styled(line.text.as_str(), style);
    if line.kind == LineKind::Title {
        rendered.centered()
    } else {
        rendered
    }
}

fn draw_status_bar(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let mut spans = Vec::new();
    if app.running {
        spans.push(Span::styled(" ⏳", Style::default().fg(theme.warning)));
    }
    spans.push(Span::styled(format!(" {}", app.status), Style::default().fg(theme.text_dim)));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_help_bar(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let help = match app.mode {
        Mode::Browse => BROWSE_HELP,
        Mode::Execute => EXECUTE_HELP,
        Mode::Edit => EDIT_HELP,
        Mode::Logs if app.logs.viewing.is_some() => LOG_VIEW_HELP,
        Mode::Logs => LOG_LIST_HELP,
    };

    frame.render_widget(
        Paragraph::new(Span::styled(format!(" {help}"), Style::default().fg(theme.text_muted))),
        area,
    );
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use ratatui::{backend::TestBackend, Terminal};

    use super::*;
    use crate::app::{Event, ExecuteSession};
    use crate::core::{Config, FileEntry};
    use crate::sop::parse_sop_str;

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| draw(frame, app, &Theme::default())).unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    fn config() -> Config {
        Config {
            sop_dir: PathBuf::from("/srv/sops"),
            log_dir: PathBuf::from("/srv/logs"),
            executed_by: "tester".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_path_context() {
        let root = Path::new("/srv/sops");
        assert_eq!(path_context("SOPs", root, root), " SOPs ");
        assert_eq!(path_context("SOPs", &root.join("web"), root), " SOPs: /web ");
    }

    #[test]
    fn test_browse_view_lists_entries() {
        let (app, _) = App::new(&config()).update(Event::SopsListed {
            dir: PathBuf::from("/srv/sops"),
            result: Ok(vec![
                FileEntry::dir(PathBuf::from("/srv/sops/web"), "Directory"),
                FileEntry::file(PathBuf::from("/srv/sops/restart.md"), "Restart"),
            ]),
        });

        let screen = render(&app);
        assert!(screen.contains("Opsy - Browser"));
        assert!(screen.contains("web/"));
        assert!(screen.contains("restart.md"));
        assert!(screen.contains("q quit"));
    }

    #[test]
    fn test_execute_view_shows_steps() {
        let mut app = App::new(&config());
        app.mode = Mode::Execute;
        app.session = Some(ExecuteSession::new(parse_sop_str(
            "# Deploy\n\n## Build\n\n```bash\nmake\n```\n",
            "/srv/sops/deploy.md",
        )));

        let screen = render(&app);
        assert!(screen.contains("Opsy - Execution"));
        assert!(screen.contains("make"));
        assert!(screen.contains("e edit"));
    }

    #[test]
    fn test_edit_view_shows_command() {
        let mut app = App::new(&config());
        app.session = Some(ExecuteSession::new(parse_sop_str(
            "```bash\nuptime\n```\n",
            "/srv/sops/a.md",
        )));
        app.mode = Mode::Execute;
        let (app, _) = app.update(Event::Edit);

        let screen = render(&app);
        assert!(screen.contains("Editing Step 1/1"));
        assert!(screen.contains("> uptime"));
    }
}
