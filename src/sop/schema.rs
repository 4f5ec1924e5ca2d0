//! SOP document definitions.
//!
//! Defines the structures extracted from a markdown SOP file.

use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Commands longer than this get an ellipsis on their derived title.
pub const TITLE_TRUNCATE_LEN: usize = 50;

/// A parsed Standard Operating Procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SopDocument {
    /// Path the document was loaded from
    pub path: PathBuf,

    /// Title from the first H1 heading (empty if none)
    pub title: String,

    /// Executable steps in source order
    pub steps: Vec<Step>,

    /// Modification time of the source file, when known
    #[serde(skip)]
    pub modified: Option<SystemTime>,
}

/// Shell dialect named on a step's code fence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    #[default]
    Bash,
    Sh,
    Shell,
}

impl CommandType {
    /// Match a fence language tag, case-insensitively.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "bash" => Some(Self::Bash),
            "sh" => Some(Self::Sh),
            "shell" => Some(Self::Shell),
            _ => None,
        }
    }

    /// The lower-case tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::Sh => "sh",
            Self::Shell => "shell",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step in the SOP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based position among the document's steps
    pub id: usize,

    /// Display title derived from the command
    pub title: String,

    /// Text found above the code fence
    pub description: String,

    /// Command to execute
    pub command: String,

    /// Language tag of the fence
    pub command_type: CommandType,

    /// 1-based line of the opening fence
    pub line_number: usize,
}

impl Step {
    /// Create a step, deriving its title from the command.
    pub fn new(id: usize, command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            id,
            title: title_from_command(&command),
            description: String::new(),
            command,
            command_type: CommandType::Bash,
            line_number: 0,
        }
    }
}

impl SopDocument {
    /// Title to show for this document, falling back to the file name.
    pub fn display_title(&self) -> String {
        if self.title.is_empty() {
            self.file_name()
        } else {
            self.title.clone()
        }
    }

    /// File name of the source path.
    pub fn file_name(&self) -> String {
        self.path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown").to_string()
    }
}

/// First whitespace-delimited token of a command, with `...` appended when the
/// command is longer than [`TITLE_TRUNCATE_LEN`] characters.
pub fn title_from_command(command: &str) -> String {
    let first = command.split_whitespace().next().unwrap_or_default();
    if command.chars().count() > TITLE_TRUNCATE_LEN {
        format!("{first}...")
    } else {
        first.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_short_command() {
        assert_eq!(title_from_command("kubectl get pods -n web"), "kubectl");
    }

    #[test]
    fn test_title_from_long_command_signals_truncation() {
        let command = "docker run --rm -v /var/lib/postgres:/data postgres:16 pg_dumpall";
        assert!(command.len() > TITLE_TRUNCATE_LEN);
        assert_eq!(title_from_command(command), "docker...");
    }

    #[test]
    fn test_command_type_tags() {
        assert_eq!(CommandType::from_tag("BASH"), Some(CommandType::Bash));
        assert_eq!(CommandType::from_tag("Shell"), Some(CommandType::Shell));
        assert_eq!(CommandType::from_tag("sh"), Some(CommandType::Sh));
        assert_eq!(CommandType::from_tag("python"), None);
    }

    #[test]
    fn test_display_title_falls_back_to_file_name() {
        let doc = SopDocument {
            path: PathBuf::from("/srv/sops/infra/restart-nginx.md"),
            title: String::new(),
            steps: Vec::new(),
            modified: None,
        };
        assert_eq!(doc.display_title(), "restart-nginx.md");
    }
}
