//! Session Integration Tests
//!
//! Drives the state machine through the runtime the way the TUI does, against
//! real SOP and log directories.

use std::path::{Path, PathBuf};

use assert_fs::prelude::*;
use opsy::app::{EditKey, Event, Mode};
use opsy::core::{RunStatus, StepStatus};
use opsy::runlog::read_log;
use opsy::{App, Config, Runtime};

struct Fixture {
    _home: assert_fs::TempDir,
    config: Config,
}

fn fixture() -> Fixture {
    let home = assert_fs::TempDir::new().unwrap();
    home.child("sops/web/check.md")
        .write_str(
            "# Web Check\n\n\
             ## Probe\n\n```bash\necho healthy\n```\n\n\
             ## Warm cache\n\n```bash\necho warming\n```\n\n\
             ## Verify\n\n```bash\nexit 3\n```\n",
        )
        .unwrap();
    home.child("logs").create_dir_all().unwrap();

    let config = Config {
        sop_dir: home.path().join("sops"),
        log_dir: home.path().join("logs"),
        executed_by: "integration".to_string(),
        timeout_secs: 5,
    };
    Fixture { _home: home, config }
}

fn log_files(root: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".log.md"))
        .map(|e| e.into_path())
        .collect()
}

/// Browse from the root into `web/` and open `check.md`.
fn open_check(runtime: &Runtime, config: &Config) -> App {
    let mut app = runtime.dispatch(App::new(config), Event::Start);
    app = runtime.dispatch(app, Event::Select);
    app = runtime.dispatch(app, Event::Down);
    app = runtime.dispatch(app, Event::Select);
    assert_eq!(app.mode, Mode::Execute);
    app
}

#[test]
fn test_run_skip_and_fail_are_logged() {
    let Fixture { _home, config } = fixture();
    let runtime = Runtime::new(&config);
    let mut app = open_check(&runtime, &config);

    app = runtime.dispatch(app, Event::Run);
    app = runtime.dispatch(app, Event::Down);
    app = runtime.dispatch(app, Event::Skip { at: chrono::Local::now().naive_local() });
    app = runtime.dispatch(app, Event::Down);
    app = runtime.dispatch(app, Event::Run);

    let logs = log_files(&config.log_dir);
    assert_eq!(logs.len(), 1);
    assert!(logs[0].parent().unwrap().ends_with("web"));

    let (metadata, steps) = read_log(&logs[0]).unwrap();
    assert_eq!(metadata.title, "Web Check");
    assert_eq!(metadata.executed_by, "integration");
    assert_eq!(metadata.run_status(), Some(RunStatus::Failed));

    let statuses: Vec<_> = steps.iter().map(|s| s.status()).collect();
    assert_eq!(
        statuses,
        vec![Some(StepStatus::Success), Some(StepStatus::Skipped), Some(StepStatus::Error)]
    );
    assert_eq!(steps[0].output, "healthy");
    assert_eq!(app.last_log.as_deref(), Some(logs[0].as_path()));
}

#[test]
fn test_open_logs_from_execution_and_view() {
    let Fixture { _home, config } = fixture();
    let runtime = Runtime::new(&config);
    let mut app = open_check(&runtime, &config);

    app = runtime.dispatch(app, Event::Run);
    app = runtime.dispatch(app, Event::OpenLogs);
    assert_eq!(app.mode, Mode::Logs);
    assert!(app.logs.list.dir.ends_with("web"));

    let log_index = app.logs.list.entries.iter().position(|e| !e.is_dir).unwrap();
    for _ in 0..log_index {
        app = runtime.dispatch(app, Event::Down);
    }
    app = runtime.dispatch(app, Event::Select);

    let view = app.logs.viewing.as_ref().unwrap();
    assert_eq!(view.metadata.sop_name(), "check");
    assert_eq!(view.metadata.run_status(), Some(RunStatus::Interrupted));
    assert_eq!(view.steps.len(), 3);

    app = runtime.dispatch(app, Event::Back);
    assert!(app.logs.viewing.is_none());
    app = runtime.dispatch(app, Event::Back);
    assert_eq!(app.mode, Mode::Execute);
    assert_eq!(app.session.as_ref().unwrap().completed_count(), 1);
}

#[test]
fn test_edited_command_is_executed() {
    let Fixture { _home, config } = fixture();
    let runtime = Runtime::new(&config);
    let mut app = open_check(&runtime, &config);

    app = runtime.dispatch(app, Event::Edit);
    assert_eq!(app.mode, Mode::Edit);
    for _ in 0.."healthy".len() {
        app = runtime.dispatch(app, Event::EditKey(EditKey::Backspace));
    }
    for c in "edited".chars() {
        app = runtime.dispatch(app, Event::EditKey(EditKey::Char(c)));
    }
    app = runtime.dispatch(app, Event::EditConfirm);
    assert_eq!(app.mode, Mode::Execute);

    app = runtime.dispatch(app, Event::Run);
    let session = app.session.as_ref().unwrap();
    assert_eq!(session.steps[0].command, "echo edited");
    assert_eq!(session.steps[0].output, "edited");
}

#[test]
fn test_blocked_command_does_not_run() {
    let Fixture { _home, config } = fixture();
    let runtime = Runtime::new(&config);
    let mut app = open_check(&runtime, &config);

    app = runtime.dispatch(app, Event::Edit);
    app = runtime.dispatch(app, Event::EditKey(EditKey::Home));
    for _ in 0.."echo healthy".len() {
        app = runtime.dispatch(app, Event::EditKey(EditKey::Delete));
    }
    for c in "rm -rf /".chars() {
        app = runtime.dispatch(app, Event::EditKey(EditKey::Char(c)));
    }
    app = runtime.dispatch(app, Event::EditConfirm);
    app = runtime.dispatch(app, Event::Run);

    assert!(app.status.starts_with("Blocked:"));
    assert_eq!(app.session.as_ref().unwrap().steps[0].status, StepStatus::Pending);
    assert!(log_files(&config.log_dir).is_empty());
}

#[test]
fn test_quit_sets_flag() {
    let Fixture { _home, config } = fixture();
    let runtime = Runtime::new(&config);
    let app = runtime.dispatch(App::new(&config), Event::Quit);
    assert!(app.should_quit);
}
