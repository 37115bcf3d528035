//! marmot-apps: desktop-entry discovery and the application catalog.
//!
//! Provides everything between the filesystem and the menu:
//! - XDG search-root resolution
//! - `.desktop` file enumeration
//! - desktop-entry parsing with locale-suffix resolution
//! - the deduplicated, rank-aware application catalog
//! - display-name formatting and the ordered name mapping

pub mod catalog;
pub mod desktop_entry;
pub mod finder;
pub mod locale;
pub mod names;
pub mod paths;

pub use catalog::AppCatalog;
pub use desktop_entry::{parse_desktop_entry, DesktopEntry};
pub use locale::LocaleSuffixes;
pub use names::{BinaryTag, Formatter, NameMap};

use std::path::PathBuf;

/// Errors produced while turning a desktop file into a catalog record.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: missing required key `{key}`", path.display())]
    MissingKey { path: PathBuf, key: &'static str },

    #[error("{}: not an application (Type is {ty:?})", path.display())]
    NotAnApplication { path: PathBuf, ty: String },

    #[error("{}: invalid value {value:?} for key `{key}`", path.display())]
    InvalidValue {
        path: PathBuf,
        key: &'static str,
        value: String,
    },

    #[error("{}: {source}", path.display())]
    InvalidExec {
        path: PathBuf,
        #[source]
        source: marmot_exec::ExecError,
    },
}
