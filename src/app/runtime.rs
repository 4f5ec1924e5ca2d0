//! Effect runtime.
//!
//! Performs the effects requested by [`App::update`] against the file system,
//! the parser, the executor and the log codec, and feeds each outcome back
//! into the state machine before the next input is read.

use std::collections::VecDeque;
use std::path::PathBuf;

use chrono::Local;

use super::state::{App, Effect, Event, LogTarget};
use crate::core::{Config, StepExecutor};
use crate::runlog::{list_entries, read_log, resolve_context_dir, LogWriter};
use crate::sop::{list_sop_dir, parse_sop};

/// Executes effects for the interactive session.
#[derive(Debug, Clone)]
pub struct Runtime {
    executor: StepExecutor,
    writer: LogWriter,
    sop_root: PathBuf,
}

impl Runtime {
    /// Create a runtime from the configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            executor: StepExecutor::new().with_timeout(config.timeout()),
            writer: LogWriter::new(&config.log_dir),
            sop_root: config.sop_dir.clone(),
        }
    }

    /// Feed an event to the app, then perform effects until none remain.
    pub fn dispatch(&self, app: App, event: Event) -> App {
        self.dispatch_with(app, event, |_| {})
    }

    /// Like [`dispatch`](Self::dispatch), calling `before_effect` with the
    /// current state ahead of each effect so a caller can redraw while a
    /// step runs.
    pub fn dispatch_with<F>(&self, app: App, event: Event, mut before_effect: F) -> App
    where
        F: FnMut(&App),
    {
        let (mut app, effects) = app.update(event);
        let mut queue: VecDeque<Effect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            before_effect(&app);
            if let Some(follow_up) = self.perform(effect) {
                let (next, more) = app.update(follow_up);
                app = next;
                queue.extend(more);
            }
        }

        app
    }

    /// Perform one effect, returning the event that reports its outcome.
    pub fn perform(&self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::ListSops(dir) => {
                let result = list_sop_dir(&dir, &self.sop_root).map_err(|e| e.to_string());
                Some(Event::SopsListed { dir, result })
            }
            Effect::ListLogs(target) => {
                let root = self.writer.root();
                let dir = match target {
                    LogTarget::Dir(dir) => dir,
                    LogTarget::Context(folder) => resolve_context_dir(root, &folder),
                };
                let result = list_entries(&dir, root).map_err(|e| e.to_string());
                Some(Event::LogsListed { dir, result })
            }
            Effect::LoadSop(path) => {
                Some(Event::SopLoaded(parse_sop(&path).map_err(|e| e.to_string())))
            }
            Effect::ExecuteStep { index, step } => {
                let started_at = Local::now().naive_local();
                let result = self.executor.execute(&step, None);
                Some(Event::StepFinished { index, started_at, result })
            }
            Effect::SaveLog(execution) => {
                let result = self.writer.write(&execution).map_err(|e| {
                    tracing::warn!(run = %execution.id, error = %e, "Failed to save execution log");
                    e.to_string()
                });
                Some(Event::LogSaved(result))
            }
            Effect::OpenLog(path) => {
                let result = read_log(&path).map_err(|e| e.to_string());
                Some(Event::LogOpened { path, result })
            }
            Effect::Quit => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::NaiveDate;

    use super::*;
    use crate::app::{ExecuteSession, Mode};
    use crate::core::{ExecutionResult, StepStatus};
    use crate::sop::parse_sop_str;

    fn setup() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let sops = dir.path().join("sops");
        let logs = dir.path().join("logs");
        std::fs::create_dir_all(sops.join("web")).unwrap();
        std::fs::create_dir_all(&logs).unwrap();
        std::fs::write(
            sops.join("web").join("check.md"),
            "# Check\n\n```bash\necho healthy\n```\n\n```bash\nexit 3\n```\n",
        )
        .unwrap();

        let config = Config {
            sop_dir: sops,
            log_dir: logs,
            executed_by: "tester".to_string(),
            timeout_secs: 5,
        };
        (dir, config)
    }

    fn log_files(root: &Path) -> Vec<PathBuf> {
        walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".log.md"))
            .map(|e| e.into_path())
            .collect()
    }

    fn loaded(config: &Config) -> App {
        let document = parse_sop_str(
            "```bash\necho one\n```\n\n```bash\necho two\n```\n",
            config.sop_dir.join("web").join("two.md"),
        );
        let (app, effects) = App::new(config).update(Event::SopLoaded(Ok(document)));
        assert!(effects.is_empty());
        app
    }

    fn finished(index: usize, status: StepStatus) -> Event {
        let at = NaiveDate::from_ymd_opt(2025, 10, 9).unwrap().and_hms_opt(22, 37, 14).unwrap();
        Event::StepFinished {
            index,
            started_at: at,
            result: Ok(ExecutionResult {
                executed_at: at,
                status,
                output: String::new(),
                exit_code: 0,
                error: None,
            }),
        }
    }

    /// Feed an event through `update` and perform whatever it asks for.
    fn step_through(runtime: &Runtime, app: App, event: Event) -> (App, Vec<Effect>) {
        let (mut app, effects) = app.update(event);
        for effect in effects.clone() {
            if let Some(follow_up) = runtime.perform(effect) {
                app = app.update(follow_up).0;
            }
        }
        (app, effects)
    }

    #[test]
    fn test_nothing_saved_while_all_steps_pending() {
        let (_dir, config) = setup();
        let runtime = Runtime::new(&config);
        let app = loaded(&config);

        // A result for a step that no longer exists leaves every step pending.
        let (app, effects) = step_through(&runtime, app, finished(7, StepStatus::Success));
        assert!(!effects.iter().any(|e| matches!(e, Effect::SaveLog(_))));

        // So does a result that is itself still pending.
        let (app, effects) = step_through(&runtime, app, finished(0, StepStatus::Pending));
        assert!(!effects.iter().any(|e| matches!(e, Effect::SaveLog(_))));

        let session = app.session.as_ref().unwrap();
        assert!(session.steps.iter().all(|s| s.status == StepStatus::Pending));
        assert!(app.last_log.is_none());
        assert!(log_files(&config.log_dir).is_empty());
    }

    #[test]
    fn test_first_result_triggers_the_first_save() {
        let (_dir, config) = setup();
        let runtime = Runtime::new(&config);

        let (app, effects) =
            step_through(&runtime, loaded(&config), finished(0, StepStatus::Success));
        assert!(matches!(&effects[..], [Effect::SaveLog(_)]));

        let logs = log_files(&config.log_dir);
        assert_eq!(logs.len(), 1);
        assert_eq!(app.last_log.as_deref(), Some(logs[0].as_path()));
    }

    #[test]
    fn test_run_writes_one_log_per_session() {
        let (_dir, config) = setup();
        let runtime = Runtime::new(&config);

        let app = runtime.dispatch(App::new(&config), Event::Start);
        let app = runtime.dispatch(app, Event::Select);
        assert_eq!(app.browser.dir, config.sop_dir.join("web"));
        assert!(app.browser.entries[0].is_parent_link());

        let app = runtime.dispatch(app, Event::Down);
        let app = runtime.dispatch(app, Event::Select);
        assert_eq!(app.mode, Mode::Execute);

        let app = runtime.dispatch(app, Event::Run);
        let app = runtime.dispatch(app, Event::Down);
        let app = runtime.dispatch(app, Event::Run);

        let session = app.session.as_ref().unwrap();
        assert_eq!(session.steps[0].status, StepStatus::Success);
        assert_eq!(session.steps[0].output, "healthy");
        assert_eq!(session.steps[1].status, StepStatus::Error);
        assert_eq!(app.status, "Step execution error");

        let logs = log_files(&config.log_dir);
        assert_eq!(logs.len(), 1);
        assert_eq!(app.last_log.as_deref(), Some(logs[0].as_path()));

        let content = std::fs::read_to_string(&logs[0]).unwrap();
        assert!(content.contains("> **Status:** ❌ Failed"));
        assert!(content.contains("> **Executed by:** tester"));
    }

    #[test]
    fn test_open_missing_log_reports_error() {
        let (_dir, config) = setup();
        let runtime = Runtime::new(&config);
        let event = runtime.perform(Effect::OpenLog(config.log_dir.join("nope.log.md")));
        assert!(matches!(event, Some(Event::LogOpened { result: Err(_), .. })));
    }

    #[test]
    fn test_dispatch_with_sees_running_state() {
        let (_dir, config) = setup();
        let runtime = Runtime::new(&config);
        let mut app = App::new(&config);
        app.mode = Mode::Execute;
        app.session = Some(ExecuteSession::new(parse_sop_str(
            "```bash\necho hi\n```\n",
            config.sop_dir.join("a.md"),
        )));

        let mut seen_running = false;
        let app = runtime.dispatch_with(app, Event::Run, |app| seen_running |= app.running);

        assert!(seen_running);
        assert!(!app.running);
    }

    #[test]
    fn test_quit_has_no_follow_up() {
        let (_dir, config) = setup();
        assert!(Runtime::new(&config).perform(Effect::Quit).is_none());
    }
}
