//! Application state and the interaction state machine.
//!
//! [`App::update`] is a pure transition: it takes an [`Event`] and returns
//! the next state plus the [`Effect`]s to perform. Effects are carried out by
//! the [`Runtime`](super::Runtime), whose results come back as events.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use super::edit::{EditKey, LineEditor};
use super::session::ExecuteSession;
use super::viewport::{layout_log, layout_session, Viewport};
use crate::core::{
    validate_command, Config, ExecError, ExecutionResult, FileEntry, StepStatus,
};
use crate::runlog::{sop_folder, LogMetadata, LogStep, SopExecution};
use crate::sop::{SopDocument, Step};

/// Rows taken by the header, status line, help bar and content border.
pub const CHROME_HEIGHT: usize = 5;

/// Content height assumed until the first resize.
pub const DEFAULT_CONTENT_HEIGHT: usize = 10;

/// Application modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Browsing the SOP directory tree
    #[default]
    Browse,

    /// Stepping through a loaded SOP
    Execute,

    /// Editing the current step's command
    Edit,

    /// Browsing or viewing execution logs
    Logs,
}

impl Mode {
    /// Short name for the header.
    pub fn label(self) -> &'static str {
        match self {
            Self::Browse => "Browser",
            Self::Execute => "Execution",
            Self::Edit => "Edit",
            Self::Logs => "Logs",
        }
    }
}

/// Scroll requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scroll {
    HalfPageUp,
    HalfPageDown,
    PageUp,
    PageDown,
    Top,
    Bottom,
}

/// Inputs to the state machine: user intents and effect outcomes.
#[derive(Debug, Clone)]
pub enum Event {
    /// Initial listing of the SOP directory
    Start,
    Quit,
    Up,
    Down,
    Scroll(Scroll),
    Select,
    Back,
    Parent,
    Home,
    OpenLogs,
    Run,
    Skip { at: NaiveDateTime },
    Edit,
    EditKey(EditKey),
    EditConfirm,
    EditCancel,
    Resize { width: u16, height: u16 },

    SopsListed { dir: PathBuf, result: Result<Vec<FileEntry>, String> },
    LogsListed { dir: PathBuf, result: Result<Vec<FileEntry>, String> },
    SopLoaded(Result<SopDocument, String>),
    StepFinished {
        index: usize,
        started_at: NaiveDateTime,
        result: Result<ExecutionResult, ExecError>,
    },
    LogSaved(Result<PathBuf, String>),
    LogOpened { path: PathBuf, result: Result<(LogMetadata, Vec<LogStep>), String> },
}

/// Which log directory to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// A directory under the log root
    Dir(PathBuf),

    /// The best directory for an SOP folder name
    Context(String),
}

/// Side effects requested by a transition.
#[derive(Debug, Clone)]
pub enum Effect {
    ListSops(PathBuf),
    ListLogs(LogTarget),
    LoadSop(PathBuf),
    ExecuteStep { index: usize, step: Step },
    SaveLog(SopExecution),
    OpenLog(PathBuf),
    Quit,
}

/// A directory listing with a selection.
#[derive(Debug, Clone, Default)]
pub struct DirList {
    pub dir: PathBuf,
    pub entries: Vec<FileEntry>,
    pub selected: usize,
}

impl DirList {
    fn new(dir: PathBuf) -> Self {
        Self { dir, entries: Vec::new(), selected: 0 }
    }

    /// The highlighted entry.
    pub fn selected_entry(&self) -> Option<&FileEntry> {
        self.entries.get(self.selected)
    }

    fn move_by(&mut self, delta: isize) {
        let last = self.entries.len().saturating_sub(1);
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }

    fn replace(&mut self, dir: PathBuf, entries: Vec<FileEntry>) {
        if dir != self.dir {
            self.selected = 0;
        }
        self.dir = dir;
        self.entries = entries;
        self.selected = self.selected.min(self.entries.len().saturating_sub(1));
    }
}

/// A log file opened for viewing.
#[derive(Debug, Clone)]
pub struct LogView {
    pub path: PathBuf,
    pub metadata: LogMetadata,
    pub steps: Vec<LogStep>,
    pub current: usize,
    pub viewport: Viewport,
}

/// Log browser state.
#[derive(Debug, Clone, Default)]
pub struct LogBrowser {
    pub list: DirList,

    /// Mode to return to on back
    pub return_to: Mode,

    /// Open log, if any
    pub viewing: Option<LogView>,
}

/// Main application state.
#[derive(Debug, Clone)]
pub struct App {
    /// Current mode of the application
    pub mode: Mode,

    /// Base SOP directory; browsing never goes above it
    pub sop_root: PathBuf,

    /// Log root; the log browser never goes above it
    pub log_root: PathBuf,

    /// Operator name recorded in logs
    pub executed_by: String,

    /// SOP directory listing
    pub browser: DirList,

    /// Loaded SOP, if any
    pub session: Option<ExecuteSession>,

    /// Command editor
    pub editor: LineEditor,

    /// Log browser
    pub logs: LogBrowser,

    /// Scroll state of the step view
    pub viewport: Viewport,

    /// Content width used for layout
    pub width: usize,

    /// Status message to display
    pub status: String,

    /// Whether a step execution is outstanding
    pub running: bool,

    /// Path of the most recently saved log
    pub last_log: Option<PathBuf>,

    /// Whether the application should quit
    pub should_quit: bool,
}

impl App {
    /// Create the initial state from the configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            mode: Mode::Browse,
            sop_root: config.sop_dir.clone(),
            log_root: config.log_dir.clone(),
            executed_by: config.executed_by.clone(),
            browser: DirList::new(config.sop_dir.clone()),
            session: None,
            editor: LineEditor::default(),
            logs: LogBrowser { list: DirList::new(config.log_dir.clone()), ..LogBrowser::default() },
            viewport: Viewport::new(DEFAULT_CONTENT_HEIGHT),
            width: 80,
            status: "Ready".to_string(),
            running: false,
            last_log: None,
            should_quit: false,
        }
    }

    /// Apply an event, returning the next state and the effects to perform.
    pub fn update(mut self, event: Event) -> (Self, Vec<Effect>) {
        let effects = match event {
            Event::Quit => {
                self.should_quit = true;
                vec![Effect::Quit]
            }
            Event::Resize { width, height } => {
                self.resize(width, height);
                Vec::new()
            }
            Event::SopsListed { dir, result } => {
                match result {
                    Ok(entries) => self.browser.replace(dir, entries),
                    Err(e) => self.status = format!("Error reading directory: {e}"),
                }
                Vec::new()
            }
            Event::LogsListed { dir, result } => {
                match result {
                    Ok(entries) => self.logs.list.replace(dir, entries),
                    Err(e) => self.status = format!("Error reading log directory: {e}"),
                }
                Vec::new()
            }
            Event::SopLoaded(result) => {
                self.on_sop_loaded(result);
                Vec::new()
            }
            Event::StepFinished { index, started_at, result } => {
                self.on_step_finished(index, started_at, result)
            }
            Event::LogSaved(result) => {
                match result {
                    Ok(path) => self.last_log = Some(path),
                    Err(e) => self.status = format!("Error saving log: {e}"),
                }
                Vec::new()
            }
            Event::LogOpened { path, result } => {
                self.on_log_opened(path, result);
                Vec::new()
            }
            input => match self.mode {
                Mode::Browse => self.on_browse(input),
                Mode::Execute => self.on_execute(input),
                Mode::Edit => self.on_edit(input),
                Mode::Logs => self.on_logs(input),
            },
        };

        (self, effects)
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.width = usize::from(width).saturating_sub(2).max(20);
        let content = usize::from(height).saturating_sub(CHROME_HEIGHT).max(1);
        self.viewport.height = content;
        if let Some(view) = self.logs.viewing.as_mut() {
            view.viewport.height = content;
        }
        self.sync_viewport();
        self.sync_log_viewport();
    }

    // Browse

    fn on_browse(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Start => vec![Effect::ListSops(self.browser.dir.clone())],
            Event::Up => {
                self.browser.move_by(-1);
                Vec::new()
            }
            Event::Down => {
                self.browser.move_by(1);
                Vec::new()
            }
            Event::Scroll(scroll) => {
                let delta = self.list_scroll(scroll);
                self.browser.move_by(delta);
                Vec::new()
            }
            Event::Select => match self.browser.selected_entry().cloned() {
                Some(entry) if entry.is_parent_link() => self.browse_parent(),
                Some(entry) if entry.is_dir => {
                    self.status = format!("Entered: {}", entry.name);
                    vec![Effect::ListSops(entry.path)]
                }
                Some(entry) => vec![Effect::LoadSop(entry.path)],
                None => Vec::new(),
            },
            Event::Back | Event::Parent => self.browse_parent(),
            Event::Home => self.go_home(),
            Event::OpenLogs => {
                let folder = if self.browser.dir == self.sop_root {
                    String::new()
                } else {
                    file_name(&self.browser.dir)
                };
                self.enter_logs(folder, Mode::Browse)
            }
            _ => Vec::new(),
        }
    }

    fn browse_parent(&mut self) -> Vec<Effect> {
        match self.browser.dir.parent() {
            Some(parent) if self.browser.dir != self.sop_root => {
                self.status = "Moved to parent directory".to_string();
                vec![Effect::ListSops(parent.to_path_buf())]
            }
            _ => {
                self.status = "Already at base directory".to_string();
                Vec::new()
            }
        }
    }

    fn go_home(&mut self) -> Vec<Effect> {
        self.mode = Mode::Browse;
        self.session = None;
        self.logs.viewing = None;
        self.status = "Returned to base directory".to_string();
        vec![Effect::ListSops(self.sop_root.clone())]
    }

    fn on_sop_loaded(&mut self, result: Result<SopDocument, String>) {
        match result {
            Ok(document) => {
                self.status = format!("Loaded SOP: {}", document.display_title());
                self.session = Some(ExecuteSession::new(document));
                self.mode = Mode::Execute;
                self.viewport.offset = 0;
                self.sync_viewport();
            }
            Err(e) => self.status = format!("Error loading SOP: {e}"),
        }
    }

    // Execute

    fn on_execute(&mut self, event: Event) -> Vec<Effect> {
        let Some(session) = self.session.as_mut() else {
            self.mode = Mode::Browse;
            return Vec::new();
        };

        match event {
            Event::Up => {
                self.status = if session.move_up() {
                    format!("Moved to step {}", session.current + 1)
                } else {
                    "Already at top".to_string()
                };
                self.sync_viewport();
                Vec::new()
            }
            Event::Down => {
                self.status = if session.move_down() {
                    format!("Moved to step {}", session.current + 1)
                } else {
                    "Already at last step".to_string()
                };
                self.sync_viewport();
                Vec::new()
            }
            Event::Scroll(scroll) => {
                let total = layout_session(session, self.width).len();
                scroll_viewport(&mut self.viewport, scroll, total);
                match scroll {
                    Scroll::HalfPageUp => self.status = "Scrolled up".to_string(),
                    Scroll::HalfPageDown => self.status = "Scrolled down".to_string(),
                    _ => {}
                }
                Vec::new()
            }
            Event::Run => self.run_current(),
            Event::Skip { at } => {
                let index = session.current;
                if index < session.steps.len() {
                    session.skip(index, at);
                    self.status = "Step skipped".to_string();
                    self.sync_viewport();
                }
                Vec::new()
            }
            Event::Edit => {
                if let Some(step) = session.current_step() {
                    self.editor = LineEditor::new(step.command.clone());
                    self.mode = Mode::Edit;
                }
                Vec::new()
            }
            Event::OpenLogs => {
                let folder = sop_folder(&session.document.path);
                self.enter_logs(folder, Mode::Execute)
            }
            Event::Back => {
                self.mode = Mode::Browse;
                self.session = None;
                self.status = "Returned to SOP browser".to_string();
                vec![Effect::ListSops(self.browser.dir.clone())]
            }
            _ => Vec::new(),
        }
    }

    fn run_current(&mut self) -> Vec<Effect> {
        if self.running {
            self.status = "A step is already running".to_string();
            return Vec::new();
        }
        let Some((index, step)) = self
            .session
            .as_ref()
            .and_then(|s| s.current_step().map(|step| (s.current, step.clone())))
        else {
            self.status = "No step to run".to_string();
            return Vec::new();
        };

        if let Err(e) = validate_command(&step.command) {
            tracing::warn!(step = step.id, error = %e, "Refusing to run step");
            self.status = format!("Blocked: {e}");
            return Vec::new();
        }

        self.running = true;
        self.status = format!("Running step {}...", index + 1);
        vec![Effect::ExecuteStep { index, step }]
    }

    fn on_step_finished(
        &mut self,
        index: usize,
        started_at: NaiveDateTime,
        result: Result<ExecutionResult, ExecError>,
    ) -> Vec<Effect> {
        self.running = false;
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        session.started_at.get_or_insert(started_at);

        let result = match result {
            Ok(result) => {
                self.status = if result.success() {
                    "Step executed successfully".to_string()
                } else {
                    format!("Step execution {}", result.status)
                };
                result
            }
            Err(e) => {
                self.status = format!("Error executing step: {e}");
                ExecutionResult {
                    executed_at: started_at,
                    status: StepStatus::Error,
                    output: String::new(),
                    exit_code: 1,
                    error: Some(e.to_string()),
                }
            }
        };
        session.record(index, result);

        let snapshot = session.execution_snapshot(&self.executed_by);
        self.sync_viewport();
        snapshot.map(Effect::SaveLog).into_iter().collect()
    }

    // Edit

    fn on_edit(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::EditKey(key) => self.editor.apply(key),
            Event::EditConfirm => {
                if let Some(session) = self.session.as_mut() {
                    let index = session.current;
                    session.commit_edit(index, self.editor.value());
                }
                self.mode = Mode::Execute;
                self.status = "Command updated".to_string();
                self.sync_viewport();
            }
            Event::EditCancel | Event::Back => {
                self.mode = Mode::Execute;
                self.status = "Edit cancelled".to_string();
            }
            _ => {}
        }
        Vec::new()
    }

    // Logs

    fn enter_logs(&mut self, folder: String, from: Mode) -> Vec<Effect> {
        self.mode = Mode::Logs;
        self.logs.return_to = from;
        self.logs.viewing = None;
        self.status = "Entered logs browser".to_string();
        vec![Effect::ListLogs(LogTarget::Context(folder))]
    }

    fn on_logs(&mut self, event: Event) -> Vec<Effect> {
        if self.logs.viewing.is_some() {
            return self.on_log_view(event);
        }

        match event {
            Event::Up => {
                self.logs.list.move_by(-1);
                Vec::new()
            }
            Event::Down => {
                self.logs.list.move_by(1);
                Vec::new()
            }
            Event::Scroll(scroll) => {
                let delta = self.list_scroll(scroll);
                self.logs.list.move_by(delta);
                Vec::new()
            }
            Event::Select => match self.logs.list.selected_entry().cloned() {
                Some(entry) if entry.is_parent_link() => self.logs_parent(),
                Some(entry) if entry.is_dir => {
                    self.status = format!("Entered: {}", entry.name);
                    vec![Effect::ListLogs(LogTarget::Dir(entry.path))]
                }
                Some(entry) => vec![Effect::OpenLog(entry.path)],
                None => Vec::new(),
            },
            Event::Parent => self.logs_parent(),
            Event::Home => self.go_home(),
            Event::Back => {
                if self.logs.return_to == Mode::Execute && self.session.is_some() {
                    self.mode = Mode::Execute;
                    self.status = "Returned to SOP execution".to_string();
                    self.sync_viewport();
                    Vec::new()
                } else {
                    self.mode = Mode::Browse;
                    self.status = "Returned to SOP browser".to_string();
                    vec![Effect::ListSops(self.browser.dir.clone())]
                }
            }
            _ => Vec::new(),
        }
    }

    fn logs_parent(&mut self) -> Vec<Effect> {
        match self.logs.list.dir.parent() {
            Some(parent) if self.logs.list.dir != self.log_root => {
                self.status = "Moved to parent directory".to_string();
                vec![Effect::ListLogs(LogTarget::Dir(parent.to_path_buf()))]
            }
            _ => {
                self.status = "Already at logs root directory".to_string();
                Vec::new()
            }
        }
    }

    fn on_log_view(&mut self, event: Event) -> Vec<Effect> {
        let width = self.width;
        let Some(view) = self.logs.viewing.as_mut() else {
            return Vec::new();
        };

        match event {
            Event::Up => {
                view.current = view.current.saturating_sub(1);
                self.sync_log_viewport();
            }
            Event::Down => {
                view.current = (view.current + 1).min(view.steps.len().saturating_sub(1));
                self.sync_log_viewport();
            }
            Event::Scroll(scroll) => {
                let total = layout_log(&view.metadata, &view.steps, view.current, width).len();
                scroll_viewport(&mut view.viewport, scroll, total);
                match scroll {
                    Scroll::HalfPageUp => self.status = "Scrolled up".to_string(),
                    Scroll::HalfPageDown => self.status = "Scrolled down".to_string(),
                    _ => {}
                }
            }
            Event::Back => {
                self.logs.viewing = None;
                self.status = "Returned to log list".to_string();
            }
            Event::Home => return self.go_home(),
            _ => {}
        }
        Vec::new()
    }

    fn on_log_opened(
        &mut self,
        path: PathBuf,
        result: Result<(LogMetadata, Vec<LogStep>), String>,
    ) {
        match result {
            Ok((metadata, steps)) => {
                self.status = format!("Viewing log: {}", file_name(&path));
                self.logs.viewing = Some(LogView {
                    path,
                    metadata,
                    steps,
                    current: 0,
                    viewport: Viewport::new(self.viewport.height),
                });
                self.sync_log_viewport();
            }
            Err(e) => self.status = format!("Error reading log file: {e}"),
        }
    }

    // Viewport

    /// Keep the current step in view after the pointer or content changed.
    fn sync_viewport(&mut self) {
        if let Some(session) = &self.session {
            let layout = layout_session(session, self.width);
            self.viewport.follow(layout.step_start(session.current), layout.len());
        }
    }

    fn sync_log_viewport(&mut self) {
        let width = self.width;
        if let Some(view) = self.logs.viewing.as_mut() {
            let layout = layout_log(&view.metadata, &view.steps, view.current, width);
            view.viewport.follow(layout.step_start(view.current), layout.len());
        }
    }

    fn list_scroll(&self, scroll: Scroll) -> isize {
        let page = self.viewport.page();
        match scroll {
            Scroll::HalfPageUp => -self.viewport.half_page(),
            Scroll::HalfPageDown => self.viewport.half_page(),
            Scroll::PageUp => -page,
            Scroll::PageDown => page,
            Scroll::Top => isize::MIN,
            Scroll::Bottom => isize::MAX,
        }
    }
}

fn scroll_viewport(viewport: &mut Viewport, scroll: Scroll, total: usize) {
    match scroll {
        Scroll::HalfPageUp => viewport.scroll_by(-viewport.half_page(), total),
        Scroll::HalfPageDown => viewport.scroll_by(viewport.half_page(), total),
        Scroll::PageUp => viewport.scroll_by(-viewport.page(), total),
        Scroll::PageDown => viewport.scroll_by(viewport.page(), total),
        Scroll::Top => viewport.offset = 0,
        Scroll::Bottom => viewport.offset = viewport.max_offset(total),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string()
}
