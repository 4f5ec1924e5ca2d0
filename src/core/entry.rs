//! Directory listing entries shared by the SOP and log browsers.

use std::path::PathBuf;

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Display name (directories end with `/`)
    pub name: String,

    /// Secondary text (SOP title, "Directory", "Execution log", ...)
    pub description: String,

    /// Full path of the entry
    pub path: PathBuf,

    /// Whether the entry is a directory
    pub is_dir: bool,
}

impl FileEntry {
    /// Create a directory entry.
    pub fn dir(path: PathBuf, description: impl Into<String>) -> Self {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        Self { name: format!("{name}/"), description: description.into(), path, is_dir: true }
    }

    /// Create a file entry.
    pub fn file(path: PathBuf, description: impl Into<String>) -> Self {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
        Self { name, description: description.into(), path, is_dir: false }
    }

    /// The `../` row pointing at `parent`.
    pub fn parent(parent: PathBuf) -> Self {
        Self {
            name: "../".to_string(),
            description: "Parent directory".to_string(),
            path: parent,
            is_dir: true,
        }
    }

    /// Whether this is the synthetic parent row.
    pub fn is_parent_link(&self) -> bool {
        self.name == "../"
    }
}
