//! Listing helpers for the log browser.

use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::core::FileEntry;

const LOG_SUFFIX: &str = ".log.md";

/// List `dir` for the log browser.
///
/// Sub-directories come first, then `*.log.md` files, each group newest
/// first. A `../` row is added unless `dir` is the log root.
pub fn list_entries(dir: &Path, root: &Path) -> std::io::Result<Vec<FileEntry>> {
    let mut entries = Vec::new();
    if dir != root {
        if let Some(parent) = dir.parent() {
            entries.push(FileEntry::parent(parent.to_path_buf()));
        }
    }

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };
        let Ok(meta) = entry.metadata() else { continue };
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let name = entry.file_name().to_string_lossy().into_owned();

        if meta.is_dir() {
            dirs.push((modified, entry.path()));
        } else if name.to_lowercase().ends_with(LOG_SUFFIX) {
            files.push((modified, entry.path(), name));
        }
    }

    dirs.sort_by_key(|(modified, _)| Reverse(*modified));
    files.sort_by_key(|(modified, _, _)| Reverse(*modified));

    entries.extend(dirs.into_iter().map(|(_, path)| FileEntry::dir(path, "Log directory")));
    entries.extend(
        files
            .into_iter()
            .map(|(_, path, name)| FileEntry::file(path, describe_log(&name))),
    );

    Ok(entries)
}

/// Pick the directory to open the log browser in for an SOP folder.
///
/// Prefers `<root>/<folder>`, then the most recent `<root>/<date>/<folder>`,
/// then the root itself.
pub fn resolve_context_dir(root: &Path, folder: &str) -> PathBuf {
    if folder.is_empty() {
        return root.to_path_buf();
    }

    let direct = root.join(folder);
    if direct.is_dir() {
        return direct;
    }

    let newest = std::fs::read_dir(root).ok().and_then(|entries| {
        entries
            .filter_map(Result::ok)
            .map(|e| e.path().join(folder))
            .filter(|p| p.is_dir())
            .filter_map(|p| {
                let modified = p.metadata().and_then(|m| m.modified()).ok()?;
                Some((modified, p))
            })
            .max_by_key(|(modified, _)| *modified)
            .map(|(_, p)| p)
    });

    newest.unwrap_or_else(|| root.to_path_buf())
}

/// "Executed at HH:MM:SS" when the file name ends in the time stamp the
/// writer uses, otherwise a generic description.
fn describe_log(name: &str) -> String {
    let stem = &name[..name.len().saturating_sub(LOG_SUFFIX.len())];
    let time = stem.rsplit('_').next().unwrap_or_default();
    let is_time = time.len() == 8
        && time.bytes().enumerate().all(|(i, b)| {
            if i == 2 || i == 5 {
                b == b'-'
            } else {
                b.is_ascii_digit()
            }
        });

    if is_time && stem.contains('_') {
        format!("Executed at {}", time.replace('-', ":"))
    } else {
        "Execution log".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn touch(path: &Path, age_secs: u64) {
        std::fs::write(path, "# log\n").unwrap();
        let when = SystemTime::now() - Duration::from_secs(age_secs);
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(when).unwrap();
    }

    #[test]
    fn test_list_entries_orders_newest_first() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("09-10-2025").join("web");
        std::fs::create_dir_all(&dir).unwrap();

        touch(&dir.join("restart_08-00-00.log.md"), 300);
        touch(&dir.join("restart_09-30-00.log.md"), 10);
        touch(&dir.join("notes.txt"), 0);

        let entries = list_entries(&dir, root.path()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["../", "restart_09-30-00.log.md", "restart_08-00-00.log.md"]);
        assert_eq!(entries[1].description, "Executed at 09:30:00");
    }

    #[test]
    fn test_list_root_has_no_parent_row() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("09-10-2025")).unwrap();

        let entries = list_entries(root.path(), root.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "09-10-2025/");
        assert!(entries[0].is_dir);
    }

    #[test]
    fn test_describe_log() {
        assert_eq!(describe_log("deploy_22-37-14.log.md"), "Executed at 22:37:14");
        assert_eq!(describe_log("deploy.log.md"), "Execution log");
        assert_eq!(describe_log("a_b.log.md"), "Execution log");
    }

    #[test]
    fn test_resolve_context_prefers_direct_folder() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("web")).unwrap();
        std::fs::create_dir_all(root.path().join("09-10-2025").join("web")).unwrap();

        assert_eq!(resolve_context_dir(root.path(), "web"), root.path().join("web"));
    }

    #[test]
    fn test_resolve_context_falls_back_to_dated_folder() {
        let root = tempfile::tempdir().unwrap();
        let dated = root.path().join("09-10-2025").join("db");
        std::fs::create_dir_all(&dated).unwrap();

        assert_eq!(resolve_context_dir(root.path(), "db"), dated);
        assert_eq!(resolve_context_dir(root.path(), "missing"), root.path());
    }
}
