//! Filesystem change stream for the search roots.
//!
//! The daemon multiplexes the watcher with the control FIFO through
//! `poll(2)`, so the stream is exposed as a readiness file descriptor plus
//! a non-blocking `drain()`. The notify crate supplies the platform
//! backend (inotify on Linux, kqueue on the BSDs).

use std::collections::HashMap;
use std::os::fd::{AsRawFd, RawFd};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};

use log::{debug, warn};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::util;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Modified,
    Deleted,
}

/// One coalesced change to a desktop file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopChange {
    /// Relative identity under the root (e.g. `kde4/foo.desktop`).
    pub id: String,
    /// Rank of the root the change happened under.
    pub rank: usize,
    pub kind: ChangeKind,
}

/// A pollable source of desktop-file changes.
pub trait ChangeSource {
    /// File descriptor that becomes readable when changes are pending.
    fn readiness_fd(&self) -> RawFd;

    /// Collect all pending changes, coalesced per identity (the last kind
    /// wins).
    fn drain(&mut self) -> Vec<DesktopChange>;
}

/// notify-backed change source watching every search root.
pub struct DesktopWatcher {
    // Dropping the watcher stops its backend thread.
    _watcher: RecommendedWatcher,
    events: Receiver<notify::Result<notify::Event>>,
    pipe: util::SelfPipe,
    roots: Vec<PathBuf>,
}

impl DesktopWatcher {
    pub fn new(roots: &[PathBuf]) -> Result<Self, notify::Error> {
        let (tx, events) = channel();
        let pipe = util::self_pipe().map_err(notify::Error::io)?;
        let write_fd = pipe.write.as_raw_fd();

        // The handler runs on notify's backend thread: queue the event and
        // nudge the poll loop through the pipe.
        let mut watcher =
            notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
                let _ = tx.send(event);
                util::notify_pipe(write_fd);
            })?;

        for root in roots {
            if let Err(err) = watcher.watch(root, RecursiveMode::Recursive) {
                // Roots routinely do not exist; they just produce no events.
                debug!("not watching {}: {}", root.display(), err);
            }
        }

        Ok(DesktopWatcher {
            _watcher: watcher,
            events,
            pipe,
            roots: roots.to_vec(),
        })
    }
}

impl ChangeSource for DesktopWatcher {
    fn readiness_fd(&self) -> RawFd {
        self.pipe.read.as_raw_fd()
    }

    fn drain(&mut self) -> Vec<DesktopChange> {
        util::drain_pipe(self.pipe.read.as_raw_fd());

        let mut order: Vec<(usize, String)> = Vec::new();
        let mut latest: HashMap<(usize, String), ChangeKind> = HashMap::new();

        while let Ok(result) = self.events.try_recv() {
            let event = match result {
                Ok(event) => event,
                Err(err) => {
                    warn!("filesystem watcher error: {err}");
                    continue;
                }
            };
            let kind = match event.kind {
                EventKind::Remove(_) => ChangeKind::Deleted,
                EventKind::Create(_) | EventKind::Modify(_) => ChangeKind::Modified,
                _ => continue,
            };
            for path in &event.paths {
                let is_desktop = path
                    .file_name()
                    .map(|name| name.to_string_lossy().ends_with(".desktop"))
                    .unwrap_or(false);
                if !is_desktop {
                    continue;
                }
                let Some(rank) = self.roots.iter().position(|root| path.starts_with(root))
                else {
                    continue;
                };
                let id = match path.strip_prefix(&self.roots[rank]) {
                    Ok(relative) => relative.to_string_lossy().into_owned(),
                    Err(_) => continue,
                };
                let key = (rank, id);
                if !latest.contains_key(&key) {
                    order.push(key.clone());
                }
                latest.insert(key, kind);
            }
        }

        order
            .into_iter()
            .map(|key| {
                let kind = latest[&key];
                DesktopChange {
                    rank: key.0,
                    id: key.1,
                    kind,
                }
            })
            .collect()
    }
}
