//! Execution log codec.
//!
//! Writes a run as a markdown log and parses such logs back into their
//! header fields and steps.

mod browse;
mod labels;
mod reader;
mod record;
mod writer;

pub use browse::{list_entries, resolve_context_dir};
pub use reader::{parse_log, read_log};
pub use record::{
    ExecutionStep, LogFile, LogMetadata, LogStep, SopExecution, TIMESTAMP_FORMAT,
};
pub use writer::{format_log, sop_folder, LogError, LogWriter};
