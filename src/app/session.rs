//! Execution session state for a loaded SOP.

use chrono::NaiveDateTime;

use crate::core::{ExecutionResult, RunStatus, StepStatus};
use crate::runlog::{ExecutionStep, SopExecution};
use crate::sop::{SopDocument, Step};

/// Per-step execution state shown in the step view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnableStepState {
    pub id: usize,
    pub title: String,
    pub description: String,
    pub command: String,
    pub status: StepStatus,
    pub output: String,
    pub error: Option<String>,

    /// Last result received for this step
    pub result: Option<ExecutionResult>,
}

impl From<&Step> for RunnableStepState {
    fn from(step: &Step) -> Self {
        Self {
            id: step.id,
            title: step.title.clone(),
            description: step.description.clone(),
            command: step.command.clone(),
            status: StepStatus::Pending,
            output: String::new(),
            error: None,
            result: None,
        }
    }
}

impl RunnableStepState {
    fn apply(&mut self, result: ExecutionResult) {
        self.status = result.status;
        self.output.clone_from(&result.output);
        self.error.clone_from(&result.error);
        self.result = Some(result);
    }
}

/// A loaded SOP and the state of each of its steps.
#[derive(Debug, Clone)]
pub struct ExecuteSession {
    /// The live document; command edits are written back into it
    pub document: SopDocument,

    /// One state per document step, same order
    pub steps: Vec<RunnableStepState>,

    /// Index of the current step
    pub current: usize,

    /// Start of the first step execution in this session
    pub started_at: Option<NaiveDateTime>,
}

impl ExecuteSession {
    /// Start a session with every step pending.
    pub fn new(document: SopDocument) -> Self {
        let steps = document.steps.iter().map(RunnableStepState::from).collect();
        Self { document, steps, current: 0, started_at: None }
    }

    /// State of the current step.
    pub fn current_state(&self) -> Option<&RunnableStepState> {
        self.steps.get(self.current)
    }

    /// Document step at the current position, including any edits.
    pub fn current_step(&self) -> Option<&Step> {
        self.document.steps.get(self.current)
    }

    /// Move to the previous step. Returns `false` at the top.
    pub fn move_up(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Move to the next step. Returns `false` at the last step.
    pub fn move_down(&mut self) -> bool {
        if self.current + 1 >= self.steps.len() {
            return false;
        }
        self.current += 1;
        true
    }

    /// Store a result for the step at `index`.
    pub fn record(&mut self, index: usize, result: ExecutionResult) {
        if let Some(state) = self.steps.get_mut(index) {
            state.apply(result);
        }
    }

    /// Mark the step at `index` as skipped.
    pub fn skip(&mut self, index: usize, at: NaiveDateTime) {
        self.record(index, ExecutionResult::skipped(at));
    }

    /// Replace the command of the step at `index` in both the state and the
    /// document.
    pub fn commit_edit(&mut self, index: usize, command: &str) {
        if let Some(state) = self.steps.get_mut(index) {
            state.command = command.to_string();
        }
        if let Some(step) = self.document.steps.get_mut(index) {
            step.command = command.to_string();
        }
    }

    /// Number of steps that succeeded.
    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.status == StepStatus::Success).count()
    }

    /// Whether any step has left the pending state.
    pub fn has_progress(&self) -> bool {
        self.steps.iter().any(|s| s.status != StepStatus::Pending)
    }

    /// Build the run record for the current state of every step.
    ///
    /// Returns `None` while every step is still pending.
    pub fn execution_snapshot(&self, executed_by: &str) -> Option<SopExecution> {
        if !self.has_progress() {
            return None;
        }

        let result_times = self.steps.iter().filter_map(|s| s.result.as_ref()).map(|r| r.executed_at);
        let ended_at = result_times.clone().max()?;
        let started_at = self.started_at.or_else(|| result_times.min())?;

        let execution_log = self
            .document
            .steps
            .iter()
            .zip(&self.steps)
            .map(|(step, state)| ExecutionStep {
                step_id: state.id,
                original_step: step.clone(),
                execution_result: state.result.clone(),
            })
            .collect();

        Some(SopExecution {
            id: SopExecution::run_id(started_at),
            sop_name: self.document.display_title(),
            sop_path: self.document.path.clone(),
            executed_by: executed_by.to_string(),
            started_at,
            ended_at,
            status: RunStatus::summarize(self.steps.iter().map(|s| s.status)),
            execution_log,
        })
    }
}
