//! Markdown log writer.
//!
//! Logs are laid out as `<root>/<DD-MM-YYYY>/<sop folder>/<stem>_<HH-MM-SS>.log.md`.
//! Every save of a run rewrites the whole file.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::record::{LogFile, SopExecution, TIMESTAMP_FORMAT};

/// Folder used for SOPs that sit directly in a filesystem root.
const DEFAULT_FOLDER: &str = "default";

/// Errors raised while persisting a log.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to write log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes execution logs under a root directory.
#[derive(Debug, Clone)]
pub struct LogWriter {
    root: PathBuf,
}

impl LogWriter {
    /// Create a writer rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The log root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the log for `execution` lives.
    pub fn log_path(&self, execution: &SopExecution) -> PathBuf {
        let date = execution.started_at.format("%d-%m-%Y").to_string();
        let time = execution.started_at.format("%H-%M-%S");

        let stem = execution
            .sop_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(DEFAULT_FOLDER);

        self.root
            .join(date)
            .join(sop_folder(&execution.sop_path))
            .join(format!("{stem}_{time}.log.md"))
    }

    /// Serialize `execution` and write it, returning the file path.
    pub fn write(&self, execution: &SopExecution) -> Result<PathBuf, LogError> {
        let path = self.log_path(execution);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| LogError::Io { path: parent.to_path_buf(), source })?;
        }

        let content = format_log(&LogFile::from(execution));
        std::fs::write(&path, content)
            .map_err(|source| LogError::Io { path: path.clone(), source })?;

        tracing::debug!(path = %path.display(), run = %execution.id, "Saved execution log");
        Ok(path)
    }
}

/// Name of the directory holding an SOP, or `default` for root-level files.
pub fn sop_folder(sop_path: &Path) -> String {
    sop_path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_FOLDER)
        .to_string()
}

/// Render a log file as markdown.
pub fn format_log(log: &LogFile) -> String {
    let mut out = String::new();

    let _ = write!(out, "# {}\n\n", log.title);
    push_meta(&mut out, "SOP Run ID", &log.run_id);
    push_meta(&mut out, "Original SOP", &log.original_sop_path);
    push_meta(&mut out, "Executed by", &log.executed_by);
    push_meta(&mut out, "Started at", &log.started_at.format(TIMESTAMP_FORMAT).to_string());
    push_meta(&mut out, "Ended at", &log.ended_at.format(TIMESTAMP_FORMAT).to_string());
    let _ = write!(out, "> **Status:** {}\n\n", log.status.label());

    for step in &log.steps {
        let _ = writeln!(out, "## Step {}: {}", step.step_id, step.title);
        let _ = write!(out, "```bash\n{}\n```\n\n", step.command);

        if !step.is_pending() {
            push_meta(&mut out, "Executed", &step.executed_at);
            push_meta(&mut out, "Result", &step.result_status);

            if !step.output.is_empty() {
                out.push_str("> **Output:**\n> ```\n");
                for line in step.output.split('\n') {
                    let _ = writeln!(out, "> {line}");
                }
                out.push_str("> ```\n");
            }
        }

        out.push('\n');
    }

    out
}

/// A `> **Key:** value` line ending in a markdown hard break.
fn push_meta(out: &mut String, key: &str, value: &str) {
    let _ = writeln!(out, "> **{key}:** {value}  ");
}
