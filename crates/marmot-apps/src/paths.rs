//! XDG search-root resolution.

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

use log::warn;

/// The ranked list of `applications` directories to search.
///
/// The user-level directory (`$XDG_DATA_HOME`, falling back to
/// `~/.local/share`) comes first, then every entry of `$XDG_DATA_DIRS` in
/// its declared order. The position in the returned vector is the root's
/// rank; lower rank shadows higher on id collisions, so duplicates are kept
/// (dropping one would shift every later rank) and merely logged.
pub fn search_roots() -> Vec<PathBuf> {
    let home = env::var("HOME").unwrap_or_default();
    let data_home =
        env::var("XDG_DATA_HOME").unwrap_or_else(|_| format!("{home}/.local/share"));
    let data_dirs = env::var("XDG_DATA_DIRS")
        .unwrap_or_else(|_| "/usr/local/share:/usr/share".to_string());

    let mut roots = Vec::new();
    roots.push(PathBuf::from(&data_home).join("applications"));

    for dir in data_dirs.split(':') {
        if !dir.is_empty() {
            roots.push(PathBuf::from(dir).join("applications"));
        }
    }

    let unique: HashSet<&PathBuf> = roots.iter().collect();
    if unique.len() != roots.len() {
        warn!("search path contains duplicate directories");
    }

    roots
}
