//! Recursive enumeration of `.desktop` files under one search root.

use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

/// One discovered desktop file.
#[derive(Debug, Clone)]
pub struct FoundFile {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Path relative to the search root, slash-normalized. This is the
    /// application's identity within the root (e.g. `kde4/foo.desktop`).
    pub id: String,
}

/// Walk `root` and collect every regular `.desktop` file.
///
/// Symlinks are followed; walkdir detects cycles and those subtrees are
/// skipped with a debug log. A missing root yields an empty list.
pub fn find_desktop_files(root: &Path) -> Vec<FoundFile> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("skipping unreadable path under {}: {}", root.display(), err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("desktop") {
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let id = relative.to_string_lossy().into_owned();
        found.push(FoundFile {
            path: path.to_path_buf(),
            id,
        });
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_nested_desktop_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.desktop"), "").unwrap();
        fs::create_dir(dir.path().join("kde4")).unwrap();
        fs::write(dir.path().join("kde4/b.desktop"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let mut ids: Vec<String> = find_desktop_files(dir.path())
            .into_iter()
            .map(|f| f.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a.desktop", "kde4/b.desktop"]);
    }

    #[test]
    fn missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        assert!(find_desktop_files(&gone).is_empty());
    }
}
