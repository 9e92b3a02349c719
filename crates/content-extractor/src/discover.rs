use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::{ExtractError, extension_of};

/// Every regular file under `root` whose extension is in `extensions`,
/// sorted by path. An empty `extensions` list accepts every file.
///
/// Unreadable directory entries are logged and skipped.
pub fn discover_files<S: AsRef<str>>(
    root: &Path,
    extensions: &[S],
) -> Result<Vec<PathBuf>, ExtractError> {
    if !root.is_dir() {
        return Err(ExtractError::Io {
            path: root.display().to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
        });
    }
    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
        .collect();

    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            wanted.is_empty()
                || extension_of(e.path()).is_some_and(|ext| wanted.contains(&ext))
        })
        .map(walkdir::DirEntry::into_path)
        .collect();
    paths.sort();
    Ok(paths)
}

/// Stable identifier of `path` inside `root`: the relative path joined with
/// `/`. Falls back to the full path when `path` is outside `root`.
pub fn file_id(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn finds_matching_files_recursively_in_order() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b/nested")).unwrap();
        fs::write(root.join("b/nested/deep.MD"), "x").unwrap();
        fs::write(root.join("a.txt"), "x").unwrap();
        fs::write(root.join("b/skip.png"), "x").unwrap();
        fs::write(root.join("c.rs"), "x").unwrap();

        let found = discover_files(root, &["md", ".txt"]).unwrap();
        let ids: Vec<String> = found.iter().map(|p| file_id(root, p)).collect();
        assert_eq!(ids, ["a.txt", "b/nested/deep.MD"]);

        assert_eq!(discover_files::<&str>(root, &[]).unwrap().len(), 4);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            discover_files(&dir.path().join("nope"), &["txt"]),
            Err(ExtractError::Io { .. })
        ));
    }

    #[test]
    fn id_outside_root_keeps_full_path() {
        let id = file_id(Path::new("/data/docs"), Path::new("/other/x.txt"));
        assert!(id.ends_with("other/x.txt"));
    }
}
