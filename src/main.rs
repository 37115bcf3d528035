//! marmotmenu - fast launcher for desktop applications.
//!
//! Scans the XDG search roots for desktop entries, pipes the display names
//! through an external dmenu-style menu, and executes the selection;
//! optionally keeps running as a daemon that watches the roots for changes.

mod cli;
mod daemon;
mod dispatcher;
mod history;
mod launch;
mod menu;
mod util;
mod watcher;

use std::env;
use std::error::Error;
use std::fs::File;

use clap::Parser;
use log::{info, warn, LevelFilter};
use marmot_apps::names::BinaryTag;
use marmot_apps::{paths, AppCatalog, Formatter, LocaleSuffixes};

use crate::dispatcher::{ExecMode, SessionConfig};
use crate::history::{HistoryError, HistoryManager};
use crate::menu::Menu;
use crate::watcher::DesktopWatcher;

fn main() -> Result<(), Box<dyn Error>> {
    // Argument errors exit 1; --help and --version exit 0.
    let args = match cli::Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            err.print()?;
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };
    init_logging(&args)?;

    let ipc_socket = if args.wm_ipc {
        Some(marmot_wm::socket_path()?)
    } else {
        None
    };

    if let Some(wrapper) = &args.wrapper {
        if !args.skip_wrapper_check && wrapper.contains("i3") {
            return Err(
                "an i3 wrapper was detected; use -I for direct i3 support instead \
                 (--skip-wrapper-check overrides this check)"
                    .into(),
            );
        }
    }

    let desktops: Vec<String> = if args.use_xdg_de {
        let current = env::var("XDG_CURRENT_DESKTOP").unwrap_or_default();
        let desktops: Vec<String> = current
            .split(':')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        info!("desktop environments from $XDG_CURRENT_DESKTOP: {desktops:?}");
        desktops
    } else {
        info!("desktop environment detection is off (-x not given)");
        Vec::new()
    };

    let shell = env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
    let menu = Menu::new(args.menu.clone(), shell.clone());

    // In one-shot mode the menu starts before scanning so it shows up
    // immediately; the keys follow once the catalog is ready.
    let early_session = if args.wait_on.is_none() {
        Some(menu.spawn()?)
    } else {
        None
    };

    let roots = paths::search_roots();
    info!("found {} directories in search path", roots.len());
    for root in &roots {
        info!("  {}", root.display());
    }

    let locales = LocaleSuffixes::from_environment();
    let mut catalog = AppCatalog::build(roots, locales, desktops, args.quirks());
    #[cfg(debug_assertions)]
    catalog.check_consistency();

    eprintln!(
        "Read {} .desktop files, found {} apps.",
        catalog.files_seen(),
        catalog.count()
    );
    info!(
        "read {} .desktop files, found {} apps",
        catalog.files_seen(),
        catalog.count()
    );

    let formatter = Formatter {
        binary: if args.display_binary {
            BinaryTag::Full
        } else if args.display_binary_base {
            BinaryTag::Base
        } else {
            BinaryTag::None
        },
        include_generic: !args.no_generic,
    };
    let mapping = catalog.name_mapping(formatter, args.case_insensitive);

    let mut history = match &args.usage_log {
        Some(path) => match HistoryManager::load(path) {
            Ok(history) => Some(history),
            Err(HistoryError::LegacyFormat { .. }) => {
                warn!("history file is using the old format, converting to the new one");
                match HistoryManager::convert_v0(path, &catalog, &mapping) {
                    Ok(history) => Some(history),
                    Err(err) => {
                        warn!("history conversion failed, running without history: {err}");
                        None
                    }
                }
            }
            Err(err) => {
                warn!("cannot load history, running without it: {err}");
                None
            }
        },
        None => None,
    };

    let config = SessionConfig {
        shell: &shell,
        terminal: &args.term,
        wrapper: args.wrapper.as_deref(),
        no_exec: args.no_exec,
        ipc_socket: ipc_socket.as_deref(),
        menu_command: &args.menu,
    };

    match &args.wait_on {
        Some(fifo_path) => {
            let mut watcher = DesktopWatcher::new(catalog.roots())?;
            daemon::run(
                fifo_path,
                &menu,
                &mut catalog,
                &mut watcher,
                &mut history,
                formatter,
                args.case_insensitive,
                &config,
            )
        }
        None => {
            let session = early_session.expect("spawned before scanning");
            dispatcher::run_menu_session(
                session,
                &catalog,
                &mapping,
                &mut history,
                &config,
                ExecMode::Replace,
            )
            .map_err(|err| Box::new(err) as Box<dyn Error>)
        }
    }
}

fn init_logging(args: &cli::Args) -> Result<(), Box<dyn Error>> {
    let level = match args.log_level {
        Some(level) => level.into(),
        None => match args.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        },
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Some(path) = &args.log_file {
        let file = File::create(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}
