//! Run records handed to and produced by the log codec.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::core::{ExecutionResult, RunStatus, StepStatus};
use crate::sop::Step;

/// Timestamp format used inside log files.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One run of an SOP, as persisted to a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SopExecution {
    /// Run identifier (`run-<unix seconds>`)
    pub id: String,

    /// Display name of the SOP
    pub sop_name: String,

    /// Path of the SOP source file
    pub sop_path: PathBuf,

    /// Operator name
    pub executed_by: String,

    /// Start of the run
    pub started_at: NaiveDateTime,

    /// Time of the most recent result
    pub ended_at: NaiveDateTime,

    /// Overall outcome
    pub status: RunStatus,

    /// Every step of the SOP, in order
    pub execution_log: Vec<ExecutionStep>,
}

/// A step and the result it received during a run, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub step_id: usize,
    pub original_step: Step,
    pub execution_result: Option<ExecutionResult>,
}

impl SopExecution {
    /// Run id derived from a start time.
    pub fn run_id(started_at: NaiveDateTime) -> String {
        format!("run-{}", started_at.and_utc().timestamp())
    }
}

/// Serialized form of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub title: String,
    pub run_id: String,
    pub original_sop_path: String,
    pub executed_by: String,
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub status: RunStatus,
    pub steps: Vec<LogStep>,
}

/// A step as it appears in a log file.
///
/// Timestamps and statuses are kept as the text found in the file; an empty
/// `result_status` means the step never ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogStep {
    pub step_id: usize,
    pub title: String,
    pub command: String,
    pub executed_at: String,
    pub result_status: String,
    pub output: String,
}

impl LogStep {
    /// Whether the step has no recorded result.
    pub fn is_pending(&self) -> bool {
        self.result_status.is_empty()
    }

    /// Canonical status, `None` when the label is not recognized.
    pub fn status(&self) -> Option<StepStatus> {
        if self.is_pending() {
            Some(StepStatus::Pending)
        } else {
            StepStatus::from_label(&self.result_status)
        }
    }
}

impl From<&ExecutionStep> for LogStep {
    fn from(step: &ExecutionStep) -> Self {
        let mut log_step = Self {
            step_id: step.step_id,
            title: step.original_step.title.clone(),
            command: step.original_step.command.clone(),
            ..Self::default()
        };
        if let Some(result) = &step.execution_result {
            log_step.executed_at = result.executed_at.format(TIMESTAMP_FORMAT).to_string();
            log_step.result_status = result.status.label().to_string();
            log_step.output = result.output.clone();
        }
        log_step
    }
}

impl From<&SopExecution> for LogFile {
    fn from(execution: &SopExecution) -> Self {
        Self {
            title: execution.sop_name.clone(),
            run_id: execution.id.clone(),
            original_sop_path: execution.sop_path.display().to_string(),
            executed_by: execution.executed_by.clone(),
            started_at: execution.started_at,
            ended_at: execution.ended_at,
            status: execution.status,
            steps: execution.execution_log.iter().map(LogStep::from).collect(),
        }
    }
}

/// Header of a parsed log. Fields are empty when absent from the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogMetadata {
    pub title: String,
    pub run_id: String,
    pub sop_path: String,
    pub executed_by: String,
    pub started_at: String,
    pub ended_at: String,
    pub status: String,
}

impl LogMetadata {
    /// Canonical run status, `None` when the label is not recognized.
    pub fn run_status(&self) -> Option<RunStatus> {
        RunStatus::from_label(&self.status)
    }

    /// SOP file stem, e.g. `postgres-backup` for `.../infra/postgres-backup.md`.
    pub fn sop_name(&self) -> String {
        if self.sop_path.is_empty() {
            return "Unknown".to_string();
        }
        let name = self.sop_path.rsplit('/').next().unwrap_or(&self.sop_path);
        name.strip_suffix(".md").unwrap_or(name).to_string()
    }
}
