//! SOP documents.
//!
//! SOPs are markdown files whose fenced `bash`/`sh`/`shell` blocks are the
//! executable steps. Everything else in the file is prose for the operator.

mod parser;
mod schema;

pub use parser::{discover_sops, list_sop_dir, parse_sop, parse_sop_str, SopError};
pub use schema::{title_from_command, CommandType, SopDocument, Step, TITLE_TRUNCATE_LEN};
