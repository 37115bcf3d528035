//! The usage history store.
//!
//! A line-oriented text file: the first line is the version marker, every
//! other line is `<count>\t<display-name>`. Entries are kept sorted by
//! descending count with ties broken by most recent increment. Files
//! without the marker are the legacy v0 format, whose entries referenced
//! raw commands instead of display names.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use log::{debug, warn};
use marmot_apps::{AppCatalog, NameMap};

const MARKER: &str = "j4dd history v1";

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history file {} uses the legacy format", path.display())]
    LegacyFormat { path: PathBuf },

    #[error("history file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Frequency-ranked list of chosen display names, persisted on every
/// update.
pub struct HistoryManager {
    path: PathBuf,
    /// Sorted by descending count; within one count, most recently
    /// incremented first.
    entries: Vec<(u32, String)>,
}

impl HistoryManager {
    /// Load a v1 history file. A missing file yields an empty history; a
    /// file without the version marker is reported as legacy.
    pub fn load(path: &Path) -> Result<Self, HistoryError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(HistoryManager {
                    path: path.to_path_buf(),
                    entries: Vec::new(),
                });
            }
            Err(err) => {
                return Err(HistoryError::Io {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        let mut lines = content.lines();
        match lines.next() {
            None => {
                return Ok(HistoryManager {
                    path: path.to_path_buf(),
                    entries: Vec::new(),
                });
            }
            Some(first) if first == MARKER => {}
            Some(_) => {
                return Err(HistoryError::LegacyFormat {
                    path: path.to_path_buf(),
                });
            }
        }

        let mut entries = parse_entries(lines);
        // The file should already be sorted; a stable sort repairs hand
        // edits while preserving the tie order the file encodes.
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(HistoryManager {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Convert a legacy v0 file whose entries referenced commands.
    ///
    /// Each stored command is matched against the Exec templates of the
    /// current catalog; matches are rewritten to their display key,
    /// everything else is dropped. The converted file is written out in the
    /// v1 format immediately.
    pub fn convert_v0(
        path: &Path,
        catalog: &AppCatalog,
        mapping: &NameMap,
    ) -> Result<Self, HistoryError> {
        let content = fs::read_to_string(path).map_err(|source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut entries = Vec::new();
        for (count, command) in parse_entries(content.lines()) {
            let display = mapping.iter().find_map(|(display, id)| {
                let app = catalog.get(id)?;
                (app.exec == command).then(|| display.to_string())
            });
            match display {
                Some(display) => entries.push((count, display)),
                None => debug!("dropping stale history command: {command}"),
            }
        }
        entries.sort_by(|a, b| b.0.cmp(&a.0));

        let history = HistoryManager {
            path: path.to_path_buf(),
            entries,
        };
        history.write()?;
        Ok(history)
    }

    /// Record one selection of `name` and persist.
    pub fn increment(&mut self, name: &str) -> Result<(), HistoryError> {
        let count = match self.entries.iter().position(|(_, n)| n == name) {
            Some(at) => self.entries.remove(at).0 + 1,
            None => 1,
        };
        // Ties break most-recent first, so insert before equal counts.
        let at = self
            .entries
            .iter()
            .position(|(c, _)| *c <= count)
            .unwrap_or(self.entries.len());
        self.entries.insert(at, (count, name.to_string()));
        self.write()
    }

    /// `(count, name)` pairs in display order.
    pub fn view(&self) -> impl Iterator<Item = (u32, &str)> {
        self.entries.iter().map(|(count, name)| (*count, name.as_str()))
    }

    /// Atomic persistence: write a temp file next to the target, then
    /// rename over it.
    fn write(&self) -> Result<(), HistoryError> {
        let io_err = |source| HistoryError::Io {
            path: self.path.to_path_buf(),
            source,
        };

        let mut temp_name = self.path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(format!(".{}.tmp", process::id()));
        let temp_path = self.path.with_file_name(temp_name);

        {
            let mut file = fs::File::create(&temp_path).map_err(io_err)?;
            writeln!(file, "{MARKER}").map_err(io_err)?;
            for (count, name) in &self.entries {
                if *count == 0 {
                    continue;
                }
                writeln!(file, "{count}\t{name}").map_err(io_err)?;
            }
            file.flush().map_err(io_err)?;
        }
        fs::rename(&temp_path, &self.path).map_err(io_err)
    }
}

/// Parse `<count>\t<name>` lines, skipping malformed ones with a warning.
fn parse_entries<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<(u32, String)> {
    let mut entries = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        match line.split_once('\t') {
            Some((count, name)) if !name.is_empty() => match count.parse::<u32>() {
                Ok(count) if count > 0 => entries.push((count, name.to_string())),
                Ok(_) => {}
                Err(_) => warn!("malformed history line skipped: {line}"),
            },
            _ => warn!("malformed history line skipped: {line}"),
        }
    }
    entries
}
