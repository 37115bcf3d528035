//! Menu sessions: feed the menu, resolve the choice, launch.

use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use marmot_apps::names::Lookup;
use marmot_apps::{AppCatalog, NameMap};
use marmot_exec::{argv_to_string, build_invocation, expand, FieldContext, InvocationOptions};

use crate::history::HistoryManager;
use crate::launch;
use crate::menu::MenuSession;

/// How a launched invocation takes over from this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// One-shot mode: the launcher process becomes the application.
    Replace,
    /// Daemon mode: the application is spawned detached.
    Detach,
}

/// Session-independent launch settings.
pub struct SessionConfig<'a> {
    pub shell: &'a str,
    pub terminal: &'a str,
    pub wrapper: Option<&'a str>,
    pub no_exec: bool,
    pub ipc_socket: Option<&'a Path>,
    /// Menu command, only for diagnostics.
    pub menu_command: &'a str,
}

/// A menu session failure.
#[derive(Debug)]
pub enum SessionError {
    /// Menu pipe I/O failed. Always fatal.
    Menu(io::Error),
    /// The selection could not be launched. The daemon logs this and keeps
    /// serving.
    Launch(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Menu(err) => write!(f, "menu I/O failed: {err}"),
            SessionError::Launch(msg) => f.write_str(msg),
        }
    }
}

impl Error for SessionError {}

/// The lines fed to the menu, in order: history entries first (highest
/// count first, names that no longer resolve skipped), then the remaining
/// display keys in comparator order. Every application appears at most
/// once, with the history spelling taking precedence.
pub fn ordered_feed<'a>(
    mapping: &'a NameMap,
    history: Option<&'a HistoryManager>,
) -> Vec<&'a str> {
    let mut lines = Vec::with_capacity(mapping.len());
    let mut fed: HashSet<&str> = HashSet::new();

    if let Some(history) = history {
        for (_, name) in history.view() {
            match mapping.get(name) {
                Some(id) => {
                    if fed.insert(id) {
                        lines.push(name);
                    }
                }
                None => debug!("history name '{name}' is not in the current mapping"),
            }
        }
    }
    for (display, id) in mapping.iter() {
        if !fed.contains(id) {
            lines.push(display);
        }
    }
    lines
}

/// Run one complete menu session: write the feed, read the choice, resolve
/// it, update history, and hand off to execution.
pub fn run_menu_session(
    mut session: MenuSession,
    catalog: &AppCatalog,
    mapping: &NameMap,
    history: &mut Option<HistoryManager>,
    config: &SessionConfig,
    mode: ExecMode,
) -> Result<(), SessionError> {
    for line in ordered_feed(mapping, history.as_ref()) {
        session
            .write_key(line)
            .map_err(|err| menu_error(err, config))?;
    }

    let choice = match session.read_choice().map_err(|err| menu_error(err, config))? {
        Some(choice) => choice,
        None => {
            info!("no application has been selected");
            return Ok(());
        }
    };

    struct Selection {
        cmdstring: String,
        /// Canonical display key for the history update; None for custom
        /// commands.
        history_key: Option<String>,
        terminal: bool,
        workdir: Option<PathBuf>,
    }

    let selection = match mapping.lookup(&choice) {
        Lookup::App { id, display, args } => {
            // Mapping values are handles into the catalog the mapping was
            // built from, so resolution cannot fail.
            let app = catalog
                .get(id)
                .ok_or_else(|| SessionError::Launch(format!("application '{id}' vanished")))?;
            info!("selected '{display}' with arguments '{args}'");
            let context = FieldContext {
                user_args: &args,
                icon: app.icon.as_deref(),
                name: &app.name,
                entry_path: &app.path,
            };
            let argv = expand(&app.exec_args, &context)
                .map_err(|err| SessionError::Launch(format!("cannot launch '{display}': {err}")))?;
            Selection {
                cmdstring: argv_to_string(&argv),
                history_key: Some(display.to_string()),
                terminal: app.terminal,
                workdir: app.working_dir.clone(),
            }
        }
        Lookup::Custom => {
            info!("'{choice}' matches no application; treating it as a command");
            Selection {
                cmdstring: choice.clone(),
                history_key: None,
                terminal: false,
                workdir: None,
            }
        }
    };

    let invocation = build_invocation(
        &selection.cmdstring,
        &InvocationOptions {
            from_entry: selection.history_key.is_some(),
            terminal: selection.terminal.then_some(config.terminal),
            shell: config.shell,
            wrapper: config.wrapper,
        },
    );

    if config.no_exec {
        match config.wrapper {
            Some(wrapper) => println!("{wrapper} \"{}\"", selection.cmdstring),
            None => println!("{}", selection.cmdstring),
        }
        return Ok(());
    }

    if let Some(key) = &selection.history_key {
        if let Some(history) = history {
            if let Err(err) = history.increment(key) {
                warn!("failed to update history: {err}");
            }
        }
    }

    if let Some(socket) = config.ipc_socket {
        info!("routing over IPC: {}", invocation.ipc_payload);
        return marmot_wm::run_command(socket, &invocation.ipc_payload)
            .map_err(|err| SessionError::Launch(format!("IPC launch failed: {err}")));
    }

    info!("command: {}", argv_to_string(&invocation.argv));
    match mode {
        ExecMode::Replace => {
            let err = launch::exec_replace(&invocation.argv, selection.workdir.as_deref());
            Err(SessionError::Launch(format!(
                "couldn't execute program: {err}"
            )))
        }
        ExecMode::Detach => launch::spawn_detached(&invocation.argv, selection.workdir.as_deref())
            .map_err(|err| SessionError::Launch(format!("couldn't execute program: {err}"))),
    }
}

fn menu_error(err: io::Error, config: &SessionConfig) -> SessionError {
    if err.kind() == io::ErrorKind::BrokenPipe {
        SessionError::Menu(io::Error::new(
            io::ErrorKind::BrokenPipe,
            format!(
                "the menu process closed its pipe; is '{}' installed?",
                config.menu_command
            ),
        ))
    } else {
        SessionError::Menu(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marmot_apps::{AppCatalog, Formatter, LocaleSuffixes};
    use std::fs;

    fn catalog_with(names: &[&str]) -> AppCatalog {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            fs::write(
                dir.path().join(format!("{}.desktop", name.to_lowercase())),
                format!("[Desktop Entry]\nType=Application\nName={name}\nExec={name}\n"),
            )
            .unwrap();
        }
        AppCatalog::build(
            vec![dir.path().to_path_buf()],
            LocaleSuffixes::default(),
            Vec::new(),
            marmot_exec::EntryQuirks::NONE,
        )
    }

    #[test]
    fn feed_is_history_first_without_duplicates() {
        let catalog = catalog_with(&["A", "B", "C"]);
        let mapping = catalog.name_mapping(Formatter::default(), false);

        let dir = tempfile::tempdir().unwrap();
        let hist_path = dir.path().join("history");
        fs::write(&hist_path, "j4dd history v1\n3\tB\n1\tA\n").unwrap();
        let history = HistoryManager::load(&hist_path).unwrap();

        let feed = ordered_feed(&mapping, Some(&history));
        assert_eq!(feed, vec!["B", "A", "C"]);
    }

    #[test]
    fn feed_skips_stale_history_names() {
        let catalog = catalog_with(&["A"]);
        let mapping = catalog.name_mapping(Formatter::default(), false);

        let dir = tempfile::tempdir().unwrap();
        let hist_path = dir.path().join("history");
        fs::write(&hist_path, "j4dd history v1\n5\tUninstalled\n2\tA\n").unwrap();
        let history = HistoryManager::load(&hist_path).unwrap();

        let feed = ordered_feed(&mapping, Some(&history));
        assert_eq!(feed, vec!["A"]);
    }

    #[test]
    fn feed_without_history_is_mapping_order() {
        let catalog = catalog_with(&["C", "A", "B"]);
        let mapping = catalog.name_mapping(Formatter::default(), false);
        let feed = ordered_feed(&mapping, None);
        assert_eq!(feed, vec!["A", "B", "C"]);
    }
}
