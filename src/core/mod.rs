//! Core types and functionality for Opsy.
//!
//! Configuration, step execution and the status values shared by the rest
//! of the application.

mod config;
mod entry;
mod executor;
mod status;

pub use config::{Config, ConfigError};
pub use entry::FileEntry;
pub use executor::{
    validate_command, ExecError, ExecutionResult, StepExecutor, DEFAULT_TIMEOUT, TIMEOUT_MESSAGE,
};
pub use status::{RunStatus, StepStatus};
