//! The application catalog.
//!
//! Owns every parsed [`DesktopEntry`] and keeps the cross-root
//! deduplication state: one catalog entry per relative identity, with the
//! ranked set of roots that currently provide a file for that identity.
//! The lowest rank wins; removing the winner promotes the next source.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use log::{debug, warn};
use marmot_exec::EntryQuirks;

use crate::desktop_entry::{parse_desktop_entry, DesktopEntry};
use crate::finder::find_desktop_files;
use crate::locale::LocaleSuffixes;
use crate::names::{Formatter, NameMap};

struct CatalogEntry {
    /// Record parsed from the winning (lowest-ranked) source.
    app: DesktopEntry,
    /// All roots currently providing this identity, keyed by rank.
    sources: BTreeMap<usize, PathBuf>,
}

/// The deduplicated application catalog.
pub struct AppCatalog {
    entries: HashMap<String, CatalogEntry>,
    /// Search roots in rank order.
    roots: Vec<PathBuf>,
    locales: LocaleSuffixes,
    /// Desktop-environment tokens for OnlyShowIn/NotShowIn filtering.
    desktops: Vec<String>,
    quirks: EntryQuirks,
    /// Number of `.desktop` files seen during the initial ingest.
    files_seen: usize,
}

impl AppCatalog {
    /// Scan every root in rank order and build the catalog.
    ///
    /// Files that fail to parse are skipped with a warning; other files
    /// continue.
    pub fn build(
        roots: Vec<PathBuf>,
        locales: LocaleSuffixes,
        desktops: Vec<String>,
        quirks: EntryQuirks,
    ) -> Self {
        let mut catalog = AppCatalog {
            entries: HashMap::new(),
            roots,
            locales,
            desktops,
            quirks,
            files_seen: 0,
        };

        for rank in 0..catalog.roots.len() {
            let root = catalog.roots[rank].clone();
            for found in find_desktop_files(&root) {
                catalog.files_seen += 1;
                catalog.install(&found.id, rank);
            }
        }

        catalog
    }

    /// Number of `.desktop` files seen during the initial scan.
    pub fn files_seen(&self) -> usize {
        self.files_seen
    }

    /// Number of distinct applications.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, id: &str) -> Option<&DesktopEntry> {
        self.entries.get(id).map(|entry| &entry.app)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// A file at `id` under the root with `rank` appeared or changed.
    ///
    /// Re-parses the file. The record is installed when the source is the
    /// new or current winner; a lower-priority source is only recorded as a
    /// shadow. A file that no longer parses loses its source slot entirely,
    /// as if it had been deleted.
    pub fn add(&mut self, id: &str, rank: usize) {
        if rank >= self.roots.len() {
            warn!("change event for unknown root rank {rank}");
            return;
        }
        self.install(id, rank);
    }

    fn install(&mut self, id: &str, rank: usize) {
        let root = self.roots[rank].clone();
        let path = root.join(id);
        match parse_desktop_entry(&path, &root, id, &self.locales, self.quirks) {
            Ok(app) => match self.entries.get_mut(id) {
                Some(entry) => {
                    entry.sources.insert(rank, root);
                    let winner = *entry.sources.keys().next().unwrap();
                    if rank == winner {
                        entry.app = app;
                    }
                }
                None => {
                    let mut sources = BTreeMap::new();
                    sources.insert(rank, root);
                    self.entries
                        .insert(id.to_string(), CatalogEntry { app, sources });
                }
            },
            Err(err) => {
                warn!("skipping {}: {}", path.display(), err);
                self.drop_source(id, rank);
            }
        }
    }

    /// The file at `id` under the root with `rank` disappeared.
    ///
    /// Only the matching source is dropped; if it was the winner, the
    /// lowest-ranked shadow is promoted by re-parsing its file.
    pub fn remove(&mut self, id: &str, rank: usize) {
        self.drop_source(id, rank);
    }

    fn drop_source(&mut self, id: &str, rank: usize) {
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        if entry.sources.remove(&rank).is_none() {
            return;
        }

        let was_winner = entry
            .sources
            .keys()
            .next()
            .map_or(true, |&lowest| rank < lowest);
        if !was_winner {
            return;
        }

        // Promote the next source; shadows may themselves fail to parse by
        // now, in which case they are dropped too.
        loop {
            let next = self
                .entries
                .get(id)
                .and_then(|entry| entry.sources.iter().next())
                .map(|(&next_rank, next_root)| (next_rank, next_root.clone()));
            let Some((next_rank, next_root)) = next else {
                self.entries.remove(id);
                debug!("application '{id}' removed from catalog");
                return;
            };
            let path = next_root.join(id);
            match parse_desktop_entry(&path, &next_root, id, &self.locales, self.quirks) {
                Ok(app) => {
                    let entry = self.entries.get_mut(id).unwrap();
                    entry.app = app;
                    debug!("application '{id}' now provided by {}", next_root.display());
                    return;
                }
                Err(err) => {
                    warn!("skipping {}: {}", path.display(), err);
                    self.entries.get_mut(id).unwrap().sources.remove(&next_rank);
                }
            }
        }
    }

    /// The visibility predicate applied when building the name mapping.
    pub fn is_visible(&self, app: &DesktopEntry) -> bool {
        if app.no_display || app.hidden || !app.launchable {
            return false;
        }
        if !app.only_show_in.is_empty()
            && !app.only_show_in.iter().any(|de| self.desktops.contains(de))
        {
            return false;
        }
        if app.not_show_in.iter().any(|de| self.desktops.contains(de)) {
            return false;
        }
        true
    }

    /// Build the display-name mapping over the visible entries.
    ///
    /// Ids are visited in sorted order so collision handling (first wins)
    /// is deterministic.
    pub fn name_mapping(&self, formatter: Formatter, case_insensitive: bool) -> NameMap {
        let mut map = NameMap::new(case_insensitive);
        let mut ids: Vec<&String> = self.entries.keys().collect();
        ids.sort();
        for id in ids {
            let app = &self.entries[id].app;
            if !self.is_visible(app) {
                continue;
            }
            map.insert(formatter.display_key(app), id.clone());
        }
        map
    }

    /// Verify internal invariants. Compiled only into debug builds and
    /// called from the daemon after applying change events.
    #[cfg(debug_assertions)]
    pub fn check_consistency(&self) {
        for (id, entry) in &self.entries {
            assert!(
                !entry.sources.is_empty(),
                "catalog entry '{id}' has no sources"
            );
            assert_eq!(&entry.app.id, id, "catalog entry '{id}' id mismatch");
            let winner = *entry.sources.keys().next().unwrap();
            assert_eq!(
                entry.app.root, self.roots[winner],
                "catalog entry '{id}' not parsed from its winning root"
            );
            assert!(
                !entry.app.name.is_empty(),
                "catalog entry '{id}' has an empty name"
            );
            assert!(
                !entry.app.exec_args.is_empty(),
                "catalog entry '{id}' has an empty Exec"
            );
        }
    }
}
