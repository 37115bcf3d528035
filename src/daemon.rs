//! Daemon mode: the control FIFO and the poll loop.
//!
//! Two blocking sources are multiplexed: the control FIFO (each byte read
//! triggers one menu session, `q` shuts down) and the filesystem watcher.
//! A third fd, the SIGCHLD self-pipe, keeps launched children from
//! lingering as zombies. On every wakeup all three `revents` are inspected
//! before acting so none of the sources can starve another.

use std::error::Error;
use std::fs::OpenOptions;
use std::io::Read;
use std::os::fd::{AsRawFd, OwnedFd};
use std::path::Path;
use std::sync::atomic::{AtomicI32, Ordering};

use log::{error, info};
use marmot_apps::{AppCatalog, Formatter};

use crate::dispatcher::{self, ExecMode, SessionConfig, SessionError};
use crate::history::HistoryManager;
use crate::menu::Menu;
use crate::util;
use crate::watcher::{ChangeKind, ChangeSource};

/// Write end of the SIGCHLD self-pipe. Only ever written by the signal
/// handler; read by the poll loop.
static SIGCHLD_PIPE: AtomicI32 = AtomicI32::new(-1);

extern "C" fn on_sigchld(_: libc::c_int) {
    let fd = SIGCHLD_PIPE.load(Ordering::Relaxed);
    if fd >= 0 {
        util::notify_pipe(fd);
    }
}

/// Install the SIGCHLD handler and return the read end of its self-pipe.
fn install_sigchld() -> std::io::Result<OwnedFd> {
    let pipe = util::self_pipe()?;
    SIGCHLD_PIPE.store(pipe.write.as_raw_fd(), Ordering::Relaxed);
    // The write end stays open for the life of the process.
    std::mem::forget(pipe.write);

    let handler = on_sigchld as extern "C" fn(libc::c_int);
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler as usize;
        if libc::sigaction(libc::SIGCHLD, &action, std::ptr::null_mut()) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(pipe.read)
}

/// Reap every child that has already exited, without blocking.
fn reap_children() {
    loop {
        let pid = unsafe { libc::waitpid(-1, std::ptr::null_mut(), libc::WNOHANG) };
        if pid <= 0 {
            break;
        }
    }
}

/// Run the daemon until `q` arrives on the FIFO.
#[allow(clippy::too_many_arguments)]
pub fn run(
    fifo_path: &Path,
    menu: &Menu,
    catalog: &mut AppCatalog,
    watcher: &mut dyn ChangeSource,
    history: &mut Option<HistoryManager>,
    formatter: Formatter,
    case_insensitive: bool,
    config: &SessionConfig,
) -> Result<(), Box<dyn Error>> {
    util::mkfifo(fifo_path, 0o600)?;
    // Opened read+write so the FIFO stays open across client disconnects.
    let mut fifo = OpenOptions::new()
        .read(true)
        .write(true)
        .open(fifo_path)?;
    let sigchld = install_sigchld()?;

    let mut mapping = catalog.name_mapping(formatter, case_insensitive);
    info!("daemon ready, waiting on {}", fifo_path.display());

    loop {
        let mut fds = [
            util::pollfd_in(fifo.as_raw_fd()),
            util::pollfd_in(watcher.readiness_fd()),
            util::pollfd_in(sigchld.as_raw_fd()),
        ];
        util::poll_readable(&mut fds)?;
        let fifo_ready = fds[0].revents & libc::POLLIN != 0;
        let watch_ready = fds[1].revents & libc::POLLIN != 0;
        let chld_ready = fds[2].revents & libc::POLLIN != 0;

        if chld_ready {
            util::drain_pipe(sigchld.as_raw_fd());
            reap_children();
        }

        if watch_ready {
            // Apply every pending change before any menu session.
            for change in watcher.drain() {
                match change.kind {
                    ChangeKind::Modified => catalog.add(&change.id, change.rank),
                    ChangeKind::Deleted => catalog.remove(&change.id, change.rank),
                }
            }
            #[cfg(debug_assertions)]
            catalog.check_consistency();
            mapping = catalog.name_mapping(formatter, case_insensitive);
            #[cfg(debug_assertions)]
            for (_, id) in mapping.iter() {
                debug_assert!(catalog.get(id).is_some(), "mapping handle '{id}' is stale");
            }
        }

        if fifo_ready {
            let mut byte = [0u8; 1];
            if fifo.read(&mut byte)? == 0 {
                continue;
            }
            if byte[0] == b'q' {
                info!("received quit byte, shutting down");
                return Ok(());
            }

            let session = menu.spawn()?;
            match dispatcher::run_menu_session(
                session, catalog, &mapping, history, config, ExecMode::Detach,
            ) {
                Ok(()) => {}
                Err(err @ SessionError::Menu(_)) => return Err(Box::new(err)),
                Err(SessionError::Launch(msg)) => error!("{msg}"),
            }
        }
    }
}
