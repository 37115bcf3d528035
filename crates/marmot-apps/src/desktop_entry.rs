//! Desktop-entry parsing.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use marmot_exec::EntryQuirks;

use crate::locale::LocaleSuffixes;
use crate::EntryError;

/// One parsed desktop entry.
#[derive(Debug, Clone)]
pub struct DesktopEntry {
    /// Relative identity under the search root (e.g. `kde4/foo.desktop`).
    pub id: String,
    /// Localized display name.
    pub name: String,
    pub generic_name: Option<String>,
    pub comment: Option<String>,
    /// Raw Exec template.
    pub exec: String,
    /// The Exec template tokenized (field codes not yet expanded).
    pub exec_args: Vec<String>,
    pub icon: Option<String>,
    pub terminal: bool,
    pub only_show_in: Vec<String>,
    pub not_show_in: Vec<String>,
    pub no_display: bool,
    pub hidden: bool,
    /// `Path=` working directory for the launched process.
    pub working_dir: Option<PathBuf>,
    /// False when `TryExec` is set but does not resolve to an executable.
    pub launchable: bool,
    /// Absolute path of the source file.
    pub path: PathBuf,
    /// The search root the file came from.
    pub root: PathBuf,
}

impl DesktopEntry {
    /// First token of the Exec template, used by the binary-name formatters.
    pub fn exec_argv0(&self) -> &str {
        self.exec_args.first().map(String::as_str).unwrap_or("")
    }
}

/// Parse one desktop file into a [`DesktopEntry`].
///
/// Only the `[Desktop Entry]` section is consumed. `Type=Application`,
/// `Name` and `Exec` are required; the Exec template is tokenized here so
/// that files with invalid Exec quoting are rejected up front.
pub fn parse_desktop_entry(
    path: &Path,
    root: &Path,
    id: &str,
    locales: &LocaleSuffixes,
    quirks: EntryQuirks,
) -> Result<DesktopEntry, EntryError> {
    let content = fs::read_to_string(path).map_err(|source| EntryError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut keys: HashMap<String, String> = HashMap::new();
    let mut in_desktop_entry = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            in_desktop_entry = line == "[Desktop Entry]";
            continue;
        }
        if !in_desktop_entry {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            // Later occurrences of a key overwrite earlier ones.
            keys.insert(key.trim().to_string(), value.trim_start().to_string());
        }
    }

    let ty = keys.get("Type").ok_or_else(|| EntryError::MissingKey {
        path: path.to_path_buf(),
        key: "Type",
    })?;
    if ty != "Application" {
        return Err(EntryError::NotAnApplication {
            path: path.to_path_buf(),
            ty: ty.clone(),
        });
    }

    // An empty name is as useless as a missing one.
    let name = localized(&keys, "Name", locales)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| EntryError::MissingKey {
            path: path.to_path_buf(),
            key: "Name",
        })?;
    let exec = keys
        .get("Exec")
        .map(|raw| decode_string(raw))
        .ok_or_else(|| EntryError::MissingKey {
            path: path.to_path_buf(),
            key: "Exec",
        })?;

    let exec_args =
        marmot_exec::tokenize(&exec, quirks).map_err(|source| EntryError::InvalidExec {
            path: path.to_path_buf(),
            source,
        })?;
    if exec_args.is_empty() {
        return Err(EntryError::InvalidExec {
            path: path.to_path_buf(),
            source: marmot_exec::ExecError::InvalidExec("Exec key is empty".to_string()),
        });
    }

    let launchable = match keys.get("TryExec") {
        Some(try_exec) => resolves_to_executable(&decode_string(try_exec)),
        None => true,
    };

    Ok(DesktopEntry {
        id: id.to_string(),
        name,
        generic_name: localized(&keys, "GenericName", locales),
        comment: localized(&keys, "Comment", locales),
        exec,
        exec_args,
        icon: keys.get("Icon").map(|raw| decode_string(raw)),
        terminal: decode_bool(&keys, "Terminal", path)?,
        only_show_in: keys
            .get("OnlyShowIn")
            .map(|raw| decode_list(raw))
            .unwrap_or_default(),
        not_show_in: keys
            .get("NotShowIn")
            .map(|raw| decode_list(raw))
            .unwrap_or_default(),
        no_display: decode_bool(&keys, "NoDisplay", path)?,
        hidden: decode_bool(&keys, "Hidden", path)?,
        working_dir: keys
            .get("Path")
            .map(|raw| PathBuf::from(decode_string(raw))),
        launchable,
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    })
}

/// Resolve a localized key: try every locale suffix in order, then the
/// unsuffixed key.
fn localized(
    keys: &HashMap<String, String>,
    key: &str,
    locales: &LocaleSuffixes,
) -> Option<String> {
    for suffix in locales.suffixes() {
        if let Some(raw) = keys.get(&format!("{key}[{suffix}]")) {
            return Some(decode_string(raw));
        }
    }
    keys.get(key).map(|raw| decode_string(raw))
}

/// Decode the string escapes `\s \n \t \r \\`. Unknown escapes are kept
/// verbatim.
fn decode_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Decode a semicolon-separated list. `\;` is a literal semicolon, `\\` a
/// literal backslash; the empty element after a trailing `;` is dropped.
fn decode_list(raw: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut curr = String::new();
    let mut escaping = false;

    for ch in raw.chars() {
        if escaping {
            match ch {
                ';' => curr.push(';'),
                '\\' => curr.push('\\'),
                other => {
                    curr.push('\\');
                    curr.push(other);
                }
            }
            escaping = false;
        } else {
            match ch {
                '\\' => escaping = true,
                ';' => items.push(std::mem::take(&mut curr)),
                _ => curr.push(ch),
            }
        }
    }
    if escaping {
        curr.push('\\');
    }
    if !curr.is_empty() {
        items.push(curr);
    }
    items
}

/// Decode a boolean key; only `true` and `false` are accepted.
fn decode_bool(
    keys: &HashMap<String, String>,
    key: &'static str,
    path: &Path,
) -> Result<bool, EntryError> {
    match keys.get(key).map(String::as_str) {
        None => Ok(false),
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(EntryError::InvalidValue {
            path: path.to_path_buf(),
            key,
            value: other.to_string(),
        }),
    }
}

/// TryExec resolution: an absolute path must be an executable file, a
/// relative one must be found on `$PATH`.
fn resolves_to_executable(program: &str) -> bool {
    let candidate = Path::new(program);
    if candidate.is_absolute() {
        return is_executable_file(candidate);
    }
    let Some(path_var) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&path_var).any(|dir| is_executable_file(&dir.join(candidate)))
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse_str(content: &str) -> Result<DesktopEntry, EntryError> {
        parse_str_locale(content, &LocaleSuffixes::default())
    }

    fn parse_str_locale(
        content: &str,
        locales: &LocaleSuffixes,
    ) -> Result<DesktopEntry, EntryError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.desktop");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        parse_desktop_entry(&path, dir.path(), "app.desktop", locales, EntryQuirks::NONE)
    }

    #[test]
    fn parses_minimal_entry() {
        let entry = parse_str(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name=Editor\n\
             Exec=editor %f\n",
        )
        .unwrap();
        assert_eq!(entry.name, "Editor");
        assert_eq!(entry.exec_args, vec!["editor", "%f"]);
        assert!(!entry.terminal);
        assert!(entry.launchable);
    }

    #[test]
    fn other_sections_are_skipped() {
        let entry = parse_str(
            "[Desktop Action new]\n\
             Name=Ignored\n\
             Exec=ignored\n\
             [Desktop Entry]\n\
             Type=Application\n\
             Name=Real\n\
             Exec=real\n\
             [Another]\n\
             Name=AlsoIgnored\n",
        )
        .unwrap();
        assert_eq!(entry.name, "Real");
        assert_eq!(entry.exec, "real");
    }

    #[test]
    fn later_keys_overwrite() {
        let entry = parse_str(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name=First\n\
             Name=Second\n\
             Exec=prog\n",
        )
        .unwrap();
        assert_eq!(entry.name, "Second");
    }

    #[test]
    fn comments_and_blank_lines_ignored() {
        let entry = parse_str(
            "# header comment\n\
             \n\
             [Desktop Entry]\n\
             # inner comment\n\
             Type=Application\n\
             Name=App\n\
             Exec=app\n",
        )
        .unwrap();
        assert_eq!(entry.name, "App");
    }

    #[test]
    fn string_escapes_decode() {
        let entry = parse_str(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name=Tab\\there\\sand\\nnewline\n\
             Exec=prog\n",
        )
        .unwrap();
        assert_eq!(entry.name, "Tab\there and\nnewline");
    }

    #[test]
    fn exec_double_decoding() {
        // `\\\\` in the file is one grammar-level backslash pair.
        let entry = parse_str(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name=Sh\n\
             Exec=sh \"a\\\\\\\\b\"\n",
        )
        .unwrap();
        assert_eq!(entry.exec, "sh \"a\\\\b\"");
        assert_eq!(entry.exec_args, vec!["sh", "a\\b"]);
    }

    #[test]
    fn list_decoding() {
        let entry = parse_str(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name=App\n\
             Exec=app\n\
             OnlyShowIn=GNOME;KDE;\n\
             NotShowIn=a\\;b;c\\\\d;\n",
        )
        .unwrap();
        assert_eq!(entry.only_show_in, vec!["GNOME", "KDE"]);
        assert_eq!(entry.not_show_in, vec!["a;b", "c\\d"]);
    }

    #[test]
    fn localized_name_selection() {
        let locales = LocaleSuffixes::from_locale("de_DE.UTF-8");
        let entry = parse_str_locale(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name=Files\n\
             Name[de]=Dateien\n\
             Name[fr]=Fichiers\n\
             Exec=files\n",
            &locales,
        )
        .unwrap();
        assert_eq!(entry.name, "Dateien");

        let entry = parse_str_locale(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name=Files\n\
             Name[de_DE]=Dateien (DE)\n\
             Name[de]=Dateien\n\
             Exec=files\n",
            &locales,
        )
        .unwrap();
        assert_eq!(entry.name, "Dateien (DE)");
    }

    #[test]
    fn unmatched_locale_falls_back() {
        let locales = LocaleSuffixes::from_locale("fi");
        let entry = parse_str_locale(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name=Files\n\
             Name[de]=Dateien\n\
             Exec=files\n",
            &locales,
        )
        .unwrap();
        assert_eq!(entry.name, "Files");
    }

    #[test]
    fn missing_required_keys() {
        assert!(matches!(
            parse_str("[Desktop Entry]\nName=App\nExec=app\n"),
            Err(EntryError::MissingKey { key: "Type", .. })
        ));
        assert!(matches!(
            parse_str("[Desktop Entry]\nType=Application\nExec=app\n"),
            Err(EntryError::MissingKey { key: "Name", .. })
        ));
        assert!(matches!(
            parse_str("[Desktop Entry]\nType=Application\nName=App\n"),
            Err(EntryError::MissingKey { key: "Exec", .. })
        ));
    }

    #[test]
    fn non_application_rejected() {
        assert!(matches!(
            parse_str("[Desktop Entry]\nType=Link\nName=A\nExec=a\n"),
            Err(EntryError::NotAnApplication { .. })
        ));
    }

    #[test]
    fn invalid_bool_rejected() {
        assert!(matches!(
            parse_str(
                "[Desktop Entry]\nType=Application\nName=A\nExec=a\nTerminal=yes\n"
            ),
            Err(EntryError::InvalidValue { key: "Terminal", .. })
        ));
    }

    #[test]
    fn invalid_exec_rejected() {
        assert!(matches!(
            parse_str("[Desktop Entry]\nType=Application\nName=A\nExec=a \"b\n"),
            Err(EntryError::InvalidExec { .. })
        ));
        assert!(matches!(
            parse_str("[Desktop Entry]\nType=Application\nName=A\nExec=\n"),
            Err(EntryError::InvalidExec { .. })
        ));
    }

    #[test]
    fn try_exec_failure_marks_unlaunchable() {
        let entry = parse_str(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name=A\n\
             Exec=a\n\
             TryExec=/definitely/not/here\n",
        )
        .unwrap();
        assert!(!entry.launchable);
    }

    #[test]
    fn try_exec_absolute_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("tool");
        fs::write(&bin, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();

        let content = format!(
            "[Desktop Entry]\nType=Application\nName=A\nExec=a\nTryExec={}\n",
            bin.display()
        );
        let path = dir.path().join("app.desktop");
        fs::write(&path, content).unwrap();
        let entry = parse_desktop_entry(
            &path,
            dir.path(),
            "app.desktop",
            &LocaleSuffixes::default(),
            EntryQuirks::NONE,
        )
        .unwrap();
        assert!(entry.launchable);
    }

    #[test]
    fn flags_parse() {
        let entry = parse_str(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name=A\n\
             Exec=a\n\
             Terminal=true\n\
             NoDisplay=true\n\
             Hidden=true\n\
             Path=/var/tmp\n\
             Icon=a-icon\n",
        )
        .unwrap();
        assert!(entry.terminal);
        assert!(entry.no_display);
        assert!(entry.hidden);
        assert_eq!(entry.working_dir.as_deref(), Some(Path::new("/var/tmp")));
        assert_eq!(entry.icon.as_deref(), Some("a-icon"));
    }
}
