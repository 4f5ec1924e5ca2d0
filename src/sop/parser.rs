//! SOP parser.
//!
//! Extracts the title and the executable steps from markdown SOP files.
//! Steps come only from fenced `bash`, `sh` or `shell` code blocks; all
//! other markdown is treated as prose.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use super::schema::{CommandType, SopDocument, Step};
use crate::core::FileEntry;

/// Opening code fence with a language tag.
static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```(\w+)").expect("valid regex"));

/// Errors raised while loading SOP files.
#[derive(Debug, thiserror::Error)]
pub enum SopError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parse an SOP from a file.
pub fn parse_sop(path: &Path) -> Result<SopDocument, SopError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| SopError::Read { path: path.to_path_buf(), source })?;

    let mut doc = parse_sop_str(&content, path);
    doc.modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();

    tracing::debug!(path = ?path, steps = doc.steps.len(), "Parsed SOP");
    Ok(doc)
}

/// Parse an SOP from a string. `path` is recorded on the document only.
pub fn parse_sop_str(content: &str, path: impl Into<PathBuf>) -> SopDocument {
    let lines: Vec<&str> = content.lines().collect();

    SopDocument {
        path: path.into(),
        title: extract_title(&lines),
        steps: extract_steps(&lines),
        modified: None,
    }
}

/// Find the document title: the first ATX H1, else the first Setext H1.
fn extract_title(lines: &[&str]) -> String {
    if let Some(line) = lines.iter().find(|l| l.starts_with("# ")) {
        return line["# ".len()..].trim().to_string();
    }

    lines
        .windows(2)
        .find(|pair| !pair[0].trim().is_empty() && is_setext_underline(pair[1]))
        .map(|pair| pair[0].trim().to_string())
        .unwrap_or_default()
}

fn is_setext_underline(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c == '=')
}

fn is_fence_close(line: &str) -> bool {
    line.trim_end() == "```"
}

/// Where the scanner is relative to code fences.
enum FenceState<'a> {
    Outside,
    Command { kind: CommandType, opened_at: usize, body: Vec<&'a str> },
    Ignored,
}

fn extract_steps(lines: &[&str]) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut state = FenceState::Outside;

    for (idx, &line) in lines.iter().enumerate() {
        state = match state {
            FenceState::Outside => {
                if let Some(caps) = FENCE_OPEN.captures(line) {
                    match CommandType::from_tag(&caps[1]) {
                        Some(kind) => {
                            FenceState::Command { kind, opened_at: idx, body: Vec::new() }
                        }
                        None => FenceState::Ignored,
                    }
                } else if is_fence_close(line) {
                    // Untagged fence: prose code, never executable.
                    FenceState::Ignored
                } else {
                    FenceState::Outside
                }
            }
            FenceState::Command { kind, opened_at, mut body } => {
                if is_fence_close(line) {
                    let command = body.join("\n").trim().to_string();
                    if !command.is_empty() {
                        steps.push(Step {
                            description: find_description(lines, opened_at),
                            command_type: kind,
                            line_number: opened_at + 1,
                            ..Step::new(steps.len() + 1, command)
                        });
                    }
                    FenceState::Outside
                } else {
                    body.push(line);
                    FenceState::Command { kind, opened_at, body }
                }
            }
            FenceState::Ignored => {
                if is_fence_close(line) {
                    FenceState::Outside
                } else {
                    FenceState::Ignored
                }
            }
        };
    }

    if let FenceState::Command { opened_at, .. } = state {
        tracing::debug!(line = opened_at + 1, "Discarding unterminated code block");
    }

    steps
}

/// Walk back from the fence at `fence_idx` to the nearest non-blank line.
fn find_description(lines: &[&str], fence_idx: usize) -> String {
    let Some(line) = lines[..fence_idx].iter().rev().find(|l| !l.trim().is_empty()) else {
        return String::new();
    };

    if line.starts_with('#') {
        line.trim_start_matches(['#', ' ']).trim().to_string()
    } else if line.starts_with("```") {
        String::new()
    } else {
        line.trim().to_string()
    }
}

/// Discover every `*.md` file below `base_dir`, parsing each one.
///
/// Unreadable files are returned with their error; they never stop the walk.
pub fn discover_sops(base_dir: &Path) -> Vec<(PathBuf, Result<SopDocument, SopError>)> {
    let mut found = Vec::new();

    for entry in WalkDir::new(base_dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Error walking SOP directory");
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|e| e == "md") {
            let parsed = parse_sop(path);
            if let Err(ref e) = parsed {
                tracing::warn!(path = ?path, error = %e, "Failed to parse SOP");
            }
            found.push((path.to_path_buf(), parsed));
        }
    }

    found
}

/// List one directory of the SOP browser.
///
/// Directories come first, then markdown files described by their title.
/// A `../` row is added unless `dir` is the base directory.
pub fn list_sop_dir(dir: &Path, base_dir: &Path) -> std::io::Result<Vec<FileEntry>> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)?.filter_map(Result::ok) {
        let path = entry.path();
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        let name = entry.file_name().to_string_lossy().to_string();

        if is_dir {
            dirs.push(FileEntry::dir(path, "Directory"));
        } else if name.to_lowercase().ends_with(".md") {
            let title = parse_sop(&path)
                .ok()
                .map(|doc| doc.title)
                .filter(|t| !t.is_empty())
                .unwrap_or(name);
            files.push(FileEntry::file(path, title));
        }
    }

    dirs.sort_by(|a, b| a.name.cmp(&b.name));
    files.sort_by(|a, b| a.name.cmp(&b.name));

    let mut entries = Vec::with_capacity(dirs.len() + files.len() + 1);
    if dir != base_dir {
        if let Some(parent) = dir.parent() {
            entries.push(FileEntry::parent(parent.to_path_buf()));
        }
    }
    entries.extend(dirs);
    entries.extend(files);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_STEPS: &str = r#"# Restart Web Tier

Check what is running first.

```bash
systemctl status nginx
```

## Reload configuration

```bash
nginx -s reload
```
"#;

    #[test]
    fn test_parse_two_steps() {
        let doc = parse_sop_str(TWO_STEPS, "restart.md");

        assert_eq!(doc.title, "Restart Web Tier");
        assert_eq!(doc.steps.len(), 2);

        let first = &doc.steps[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.title, "systemctl");
        assert_eq!(first.command, "systemctl status nginx");
        assert_eq!(first.command_type, CommandType::Bash);
        assert_eq!(first.description, "Check what is running first.");
        assert_eq!(first.line_number, 5);

        let second = &doc.steps[1];
        assert_eq!(second.id, 2);
        assert_eq!(second.title, "nginx");
        assert_eq!(second.description, "Reload configuration");
        assert_eq!(second.line_number, 11);
    }

    #[test]
    fn test_atx_title_is_trimmed() {
        let doc = parse_sop_str("# Title  \n\nbody\n", "t.md");
        assert_eq!(doc.title, "Title");
    }

    #[test]
    fn test_atx_title_wins_over_earlier_setext() {
        let doc = parse_sop_str("Setext\n======\n\n# Atx\n", "t.md");
        assert_eq!(doc.title, "Atx");
    }

    #[test]
    fn test_setext_title() {
        let doc = parse_sop_str("Database Failover\n=================\n\nSteps follow.\n", "t.md");
        assert_eq!(doc.title, "Database Failover");
    }

    #[test]
    fn test_no_title() {
        let doc = parse_sop_str("just prose\n", "t.md");
        assert!(doc.title.is_empty());
        assert!(doc.steps.is_empty());
    }

    #[test]
    fn test_unterminated_fence_is_dropped() {
        let content = "```sh\necho one\n```\n\n```bash\necho two\n";
        let doc = parse_sop_str(content, "t.md");
        assert_eq!(doc.steps.len(), 1);
        assert_eq!(doc.steps[0].command, "echo one");
        assert_eq!(doc.steps[0].command_type, CommandType::Sh);
    }

    #[test]
    fn test_other_languages_are_ignored() {
        let content = "```python\nprint('hi')\n```\n\n```SHELL\nuptime\n```\n";
        let doc = parse_sop_str(content, "t.md");
        assert_eq!(doc.steps.len(), 1);
        assert_eq!(doc.steps[0].command, "uptime");
        assert_eq!(doc.steps[0].command_type, CommandType::Shell);
        assert_eq!(doc.steps[0].id, 1);
    }

    #[test]
    fn test_bash_fence_inside_untagged_block_is_not_a_step() {
        let content = "```\n```bash\nrm -rf build\n```\n";
        let doc = parse_sop_str(content, "t.md");
        assert!(doc.steps.is_empty());
    }

    #[test]
    fn test_empty_block_emits_nothing_and_keeps_ids_dense() {
        let content = "```bash\n\n```\n\n```bash\ndf -h\n```\n";
        let doc = parse_sop_str(content, "t.md");
        assert_eq!(doc.steps.len(), 1);
        assert_eq!(doc.steps[0].id, 1);
    }

    #[test]
    fn test_multiline_command_is_joined() {
        let content = "```bash\ncd /srv/app\ngit pull\n```\n";
        let doc = parse_sop_str(content, "t.md");
        assert_eq!(doc.steps[0].command, "cd /srv/app\ngit pull");
    }

    #[test]
    fn test_description_stops_at_previous_block() {
        let content = "```bash\necho a\n```\n\n```bash\necho b\n```\n";
        let doc = parse_sop_str(content, "t.md");
        assert_eq!(doc.steps[1].description, "");
    }

    #[test]
    fn test_description_from_deep_heading() {
        let content = "### 3. Drain node\n\n```bash\nkubectl drain node-1\n```\n";
        let doc = parse_sop_str(content, "t.md");
        assert_eq!(doc.steps[0].description, "3. Drain node");
    }

    #[test]
    fn test_parse_missing_file_is_read_error() {
        let err = parse_sop(Path::new("/nonexistent/opsy/sop.md")).unwrap_err();
        assert!(matches!(err, SopError::Read { .. }));
    }

    #[test]
    fn test_parse_file_sets_modified() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("backup.md");
        std::fs::write(&path, TWO_STEPS).unwrap();

        let doc = parse_sop(&path).unwrap();
        assert!(doc.modified.is_some());
        assert_eq!(doc.path, path);
    }

    #[test]
    fn test_discover_sops_recurses_and_sorts() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("infra")).unwrap();
        std::fs::write(dir.path().join("b.md"), "# B\n").unwrap();
        std::fs::write(dir.path().join("infra").join("a.md"), "# A\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let found = discover_sops(dir.path());
        let titles: Vec<_> =
            found.iter().map(|(_, doc)| doc.as_ref().unwrap().title.clone()).collect();

        assert_eq!(found.len(), 2);
        assert!(titles.contains(&"A".to_string()));
        assert!(titles.contains(&"B".to_string()));
    }

    #[test]
    fn test_list_sop_dir() {
        let base = tempfile::TempDir::new().unwrap();
        let sub = base.path().join("db");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("failover.md"), "# Failover\n").unwrap();
        std::fs::write(sub.join("untitled.md"), "no heading\n").unwrap();
        std::fs::create_dir(sub.join("archive")).unwrap();

        let root = list_sop_dir(base.path(), base.path()).unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].name, "db/");

        let entries = list_sop_dir(&sub, base.path()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["../", "archive/", "failover.md", "untitled.md"]);
        assert_eq!(entries[2].description, "Failover");
        assert_eq!(entries[3].description, "untitled.md");
    }
}
