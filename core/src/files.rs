//! Discovery of text files to index and their document paths.

use anyhow::{bail, Result};
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Recursively lists files under `root` whose name ends in `.txt` (any case),
/// depth-first with entries visited in name order. Unreadable entries are
/// logged and skipped.
pub fn list_text_files<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if !root.exists() {
        bail!("no such file or directory: {}", root.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if entry.file_type().is_file() && is_text_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_text_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_lowercase().ends_with(".txt"))
        .unwrap_or(false)
}

/// Absolute, normalized form of `path` used as its document identifier.
///
/// Normalization is lexical: `.` and `..` are resolved without touching the
/// filesystem, so a file reached through a symlinked directory keeps the
/// symlink in its identifier.
pub fn document_path(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };
    normalize(&absolute).to_string_lossy().into_owned()
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn lists_nested_text_files_only() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/nested.txt")).unwrap();
        fs::write(dir.path().join("a.TXT"), "x").unwrap();
        fs::write(dir.path().join("b/c.txt"), "x").unwrap();
        fs::write(dir.path().join("b/d.md"), "x").unwrap();
        fs::write(dir.path().join("b/nested.txt/e.txt"), "x").unwrap();

        let files = list_text_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.TXT"),
                PathBuf::from("b/c.txt"),
                PathBuf::from("b/nested.txt/e.txt"),
            ]
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(list_text_files(dir.path().join("absent")).is_err());
    }

    #[test]
    fn document_path_is_absolute_and_normalized() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("f.txt"), "x").unwrap();
        let via_parent = dir.path().join("sub/../f.txt");
        let direct = dir.path().join("f.txt");
        assert_eq!(document_path(&via_parent), document_path(&direct));
        assert!(Path::new(&document_path(&direct)).is_absolute());
    }

    #[cfg(unix)]
    #[test]
    fn document_path_keeps_symlinked_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("real")).unwrap();
        fs::write(dir.path().join("real/f.txt"), "x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();

        let through_link = dir.path().join("link/f.txt");
        assert_eq!(document_path(&through_link), through_link.to_string_lossy());
        assert_ne!(
            document_path(&through_link),
            document_path(&dir.path().join("real/f.txt"))
        );
    }
}
