//! # Opsy
//!
//! Interactive runner for standard operating procedures written in markdown.
//!
//! Opsy reads an SOP, extracts the fenced `bash`/`sh`/`shell` blocks as
//! steps, and lets an operator run, skip or edit them one at a time. Every
//! session is recorded as a markdown execution log that Opsy can browse and
//! read back.
//!
//! ## Modules
//!
//! - [`sop`]: SOP parsing and discovery
//! - [`core`]: configuration, step execution, statuses
//! - [`runlog`]: the execution log format, writer, reader and browser
//! - [`app`]: the mode-based state machine and its effect runtime
//! - [`tui`]: the ratatui front end

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::large_enum_variant)]

pub mod app;
pub mod core;
pub mod runlog;
pub mod sop;
pub mod tui;

// Re-export commonly used types
pub use app::{App, Runtime};
pub use crate::core::{Config, ExecutionResult, StepExecutor, StepStatus};
pub use sop::{parse_sop, SopDocument, Step};
