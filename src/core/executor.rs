//! Step execution module.
//!
//! Runs a step's command through `sh -c`, capturing stdout and stderr, and
//! classifies the outcome. Failures of the command itself are reported in the
//! returned [`ExecutionResult`]; only a missing command is an error.

use std::io::{Read, Write};
use std::process::{Child, Command as ProcessCommand, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use wait_timeout::ChildExt;

use super::StepStatus;
use crate::sop::Step;

/// Default bound on a step's wall-clock time.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for output pipes to drain after the shell exits.
const PIPE_GRACE: Duration = Duration::from_millis(500);

/// How long to wait after killing the process group before giving up on
/// the pipes. A process that left the group may still hold them.
const KILL_GRACE: Duration = Duration::from_millis(250);

/// Error message recorded on timed-out steps.
pub const TIMEOUT_MESSAGE: &str = "Command timed out";

/// Substrings that mark a command as destructive.
const BLOCKED_PATTERNS: &[&str] = &[
    "rm -rf /",
    "rm -rf /*",
    ":(){:|:&};:",
    ":(){ :|:& };:",
    "mkfs.",
];

/// Errors raised by the executor itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    /// The step carries no command.
    #[error("step has no command to execute")]
    NoCommand,

    /// The command matched the denylist.
    #[error("command contains potentially dangerous pattern: {pattern}")]
    DangerousCommand { pattern: &'static str },
}

/// Result of executing a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// When execution finished
    pub executed_at: NaiveDateTime,

    /// Outcome classification
    pub status: StepStatus,

    /// Stdout followed by stderr, trimmed
    pub output: String,

    /// Process exit code (-1 on timeout)
    pub exit_code: i32,

    /// Failure description, if any
    pub error: Option<String>,
}

impl ExecutionResult {
    /// A result recording that the operator skipped the step.
    pub fn skipped(at: NaiveDateTime) -> Self {
        Self {
            executed_at: at,
            status: StepStatus::Skipped,
            output: String::new(),
            exit_code: 0,
            error: None,
        }
    }

    /// Check if the step succeeded.
    pub fn success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Step executor.
#[derive(Debug, Clone)]
pub struct StepExecutor {
    /// Timeout for a single step
    pub timeout: Duration,
}

impl Default for StepExecutor {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT }
    }
}

enum Outcome {
    Exited(ExitStatus),
    TimedOut,
    WaitFailed(std::io::Error),
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Messages from the pipe reader threads.
enum Chunk {
    Data(Stream, Vec<u8>),
    Closed,
}

/// Output gathered from the pipes.
#[derive(Default)]
struct Collected {
    stdout: Vec<u8>,
    stderr: Vec<u8>,

    /// A pipe was still open when collection gave up
    abandoned: bool,
}

impl StepExecutor {
    /// Create a new executor with the default timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set execution timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute a step, optionally feeding `stdin` to the command.
    pub fn execute(
        &self,
        step: &Step,
        stdin: Option<&str>,
    ) -> Result<ExecutionResult, ExecError> {
        if step.command.trim().is_empty() {
            return Err(ExecError::NoCommand);
        }

        tracing::info!(step = step.id, command = %step.command, "Executing step");

        let mut cmd = ProcessCommand::new("sh");
        cmd.arg("-c").arg(&step.command);
        cmd.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        // Own process group so a timeout reaches everything the shell started.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(error = %e, "Failed to spawn shell");
                return Ok(ExecutionResult {
                    executed_at: now(),
                    status: StepStatus::Error,
                    output: String::new(),
                    exit_code: 1,
                    error: Some(e.to_string()),
                });
            }
        };

        let stdin_writer = stdin.and_then(|input| {
            let mut pipe = child.stdin.take()?;
            let input = input.to_owned();
            Some(thread::spawn(move || {
                // The command may exit without reading; a broken pipe is fine.
                let _ = pipe.write_all(input.as_bytes());
            }))
        });

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, Stream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, Stream::Stderr, tx.clone()));
        }
        drop(tx);

        let outcome = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => Outcome::Exited(status),
            Ok(None) => {
                tracing::warn!(
                    step = step.id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Step timed out, killing"
                );
                terminate(&mut child);
                Outcome::TimedOut
            }
            Err(e) => {
                terminate(&mut child);
                Outcome::WaitFailed(e)
            }
        };

        let collected = collect_output(&rx, readers.len(), child.id());
        if collected.abandoned {
            tracing::warn!(step = step.id, "Output pipe held by a detached process, not waiting");
        } else {
            for reader in readers {
                let _ = reader.join();
            }
            if let Some(writer) = stdin_writer {
                let _ = writer.join();
            }
        }

        let output = merge_output(&collected.stdout, &collected.stderr);
        let executed_at = now();

        let result = match outcome {
            Outcome::TimedOut => ExecutionResult {
                executed_at,
                status: StepStatus::Timeout,
                output,
                exit_code: -1,
                error: Some(TIMEOUT_MESSAGE.to_string()),
            },
            Outcome::Exited(status) if status.success() => ExecutionResult {
                executed_at,
                status: StepStatus::Success,
                output,
                exit_code: 0,
                error: None,
            },
            Outcome::Exited(status) => ExecutionResult {
                executed_at,
                status: StepStatus::Error,
                output,
                exit_code: status.code().unwrap_or(1),
                error: Some(status.to_string()),
            },
            Outcome::WaitFailed(e) => ExecutionResult {
                executed_at,
                status: StepStatus::Error,
                output,
                exit_code: 1,
                error: Some(e.to_string()),
            },
        };

        tracing::debug!(step = step.id, status = %result.status, exit_code = result.exit_code, "Step finished");
        Ok(result)
    }

}

/// Advisory check for destructive commands.
///
/// This is plain substring matching, not a sandbox; callers decide whether a
/// failure blocks execution.
pub fn validate_command(command: &str) -> Result<(), ExecError> {
    match BLOCKED_PATTERNS.iter().find(|p| command.contains(*p)) {
        Some(pattern) => Err(ExecError::DangerousCommand { pattern }),
        None => Ok(()),
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn spawn_reader<R: Read + Send + 'static>(
    mut pipe: R,
    stream: Stream,
    tx: mpsc::Sender<Chunk>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(Chunk::Data(stream, buf[..n].to_vec())).is_err() {
                        return;
                    }
                }
            }
        }
        let _ = tx.send(Chunk::Closed);
    })
}

/// Receive both streams until they close.
///
/// If a pipe is still open after the grace period, the process group is
/// killed. A process outside the group (e.g. after `setsid`) can keep the
/// pipe open anyway, so after a second short wait collection stops with
/// whatever arrived and the reader threads are left behind.
fn collect_output(rx: &mpsc::Receiver<Chunk>, expected: usize, pid: u32) -> Collected {
    let mut collected = Collected::default();
    let mut killed = false;
    let mut closed = 0;

    while closed < expected {
        let wait = if killed { KILL_GRACE } else { PIPE_GRACE };

        match rx.recv_timeout(wait) {
            Ok(Chunk::Data(Stream::Stdout, data)) => collected.stdout.extend_from_slice(&data),
            Ok(Chunk::Data(Stream::Stderr, data)) => collected.stderr.extend_from_slice(&data),
            Ok(Chunk::Closed) => closed += 1,
            Err(RecvTimeoutError::Timeout) if killed => {
                collected.abandoned = true;
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(pid, "Output still open after exit, killing process group");
                kill_group(pid);
                killed = true;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    collected
}

/// Kill the child and everything in its process group, then reap it.
fn terminate(child: &mut Child) {
    kill_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Ok(raw) = i32::try_from(pid) {
        let _ = killpg(Pid::from_raw(raw), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

/// Stdout, then stderr on its own line when present, trimmed.
fn merge_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut output = String::from_utf8_lossy(stdout).into_owned();
    if !stderr.is_empty() {
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(&String::from_utf8_lossy(stderr));
    }
    output.trim().to_string()
}
