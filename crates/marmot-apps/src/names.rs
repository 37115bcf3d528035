//! Display-name formatting and the ordered name-to-application mapping.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::path::Path;

use log::warn;

use crate::desktop_entry::DesktopEntry;

/// What, if anything, gets appended after the application name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryTag {
    /// Name only.
    #[default]
    None,
    /// `Name (path-of-exec)`.
    Full,
    /// `Name (basename-of-exec)`.
    Base,
}

/// Computes the display key shown in the menu for an application.
#[derive(Debug, Clone, Copy, Default)]
pub struct Formatter {
    pub binary: BinaryTag,
    /// Append ` (GenericName)` when set and distinct from the name.
    pub include_generic: bool,
}

impl Formatter {
    pub fn display_key(&self, app: &DesktopEntry) -> String {
        let mut key = app.name.clone();
        match self.binary {
            BinaryTag::None => {}
            BinaryTag::Full => {
                let argv0 = app.exec_argv0();
                if !argv0.is_empty() {
                    key.push_str(&format!(" ({argv0})"));
                }
            }
            BinaryTag::Base => {
                let base = Path::new(app.exec_argv0())
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if !base.is_empty() {
                    key.push_str(&format!(" ({base})"));
                }
            }
        }
        if self.include_generic {
            if let Some(generic) = &app.generic_name {
                if !generic.is_empty() && generic != &app.name {
                    key.push_str(&format!(" ({generic})"));
                }
            }
        }
        key
    }
}

/// Map key ordered by its (possibly case-folded) sort form.
///
/// Folding is ASCII-only so that byte offsets into the folded form are
/// valid for the display form, which the prefix lookup relies on.
/// Ordering and equality consider only the sort form, consistent with the
/// `Borrow<str>` impl used for lookups.
#[derive(Debug, Clone)]
struct NameKey {
    sort: String,
    display: String,
}

impl PartialEq for NameKey {
    fn eq(&self, other: &Self) -> bool {
        self.sort == other.sort
    }
}

impl Eq for NameKey {}

impl PartialOrd for NameKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NameKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort.cmp(&other.sort)
    }
}

impl Borrow<str> for NameKey {
    fn borrow(&self) -> &str {
        &self.sort
    }
}

/// The result of resolving a menu choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// The choice names an application, possibly with extra arguments the
    /// user typed after the display key.
    App {
        id: &'a str,
        /// The canonical display key that matched.
        display: &'a str,
        args: String,
    },
    /// The choice matches nothing; treat it as a raw command.
    Custom,
}

/// Ordered mapping from display key to application identity.
///
/// Keys are unique under the active comparator; on collision the first
/// insertion wins. Values are relative-id handles resolved through the
/// catalog, so the map can be rebuilt from scratch whenever the catalog
/// changes.
#[derive(Debug, Default)]
pub struct NameMap {
    map: BTreeMap<NameKey, String>,
    case_insensitive: bool,
}

impl NameMap {
    pub fn new(case_insensitive: bool) -> Self {
        NameMap {
            map: BTreeMap::new(),
            case_insensitive,
        }
    }

    fn fold(&self, s: &str) -> String {
        if self.case_insensitive {
            s.to_ascii_lowercase()
        } else {
            s.to_string()
        }
    }

    /// Insert a display key; keeps the existing entry on collision.
    pub fn insert(&mut self, display: String, id: String) {
        let key = NameKey {
            sort: self.fold(&display),
            display,
        };
        if let Some(existing) = self.map.get(key.sort.as_str()) {
            warn!(
                "applications '{}' and '{}' share the display name '{}'; keeping the first",
                existing, id, key.display
            );
            return;
        }
        self.map.insert(key, id);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Display keys in comparator order.
    pub fn display_keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(|key| key.display.as_str())
    }

    /// `(display key, application id)` pairs in comparator order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map
            .iter()
            .map(|(key, id)| (key.display.as_str(), id.as_str()))
    }

    /// Application id for an exact display key (under the comparator).
    pub fn get(&self, display: &str) -> Option<&str> {
        self.map.get(self.fold(display).as_str()).map(String::as_str)
    }

    /// Resolve a menu choice: exact match first, then any key that is a
    /// prefix of the choice followed by a space (the remainder becomes the
    /// launch arguments), otherwise a custom command.
    pub fn lookup(&self, choice: &str) -> Lookup<'_> {
        let folded = self.fold(choice);
        if let Some((key, id)) = self.map.get_key_value(folded.as_str()) {
            return Lookup::App {
                id,
                display: &key.display,
                args: String::new(),
            };
        }
        for (key, id) in &self.map {
            let len = key.sort.len();
            if folded.len() > len
                && folded.starts_with(key.sort.as_str())
                && folded.as_bytes()[len] == b' '
            {
                return Lookup::App {
                    id,
                    display: &key.display,
                    args: choice[len + 1..].to_string(),
                };
            }
        }
        Lookup::Custom
    }
}
