//! Exec key grammar: validation, tokenization and field-code expansion.
//!
//! The Exec value reaching this module has already been through the general
//! string decoding of the desktop-entry format; this module implements the
//! second, Exec-specific level of quoting.

use std::path::Path;

use log::warn;

use crate::ExecError;

/// Lenient-parsing switches for Exec keys that do not conform to the
/// desktop-entry specification but occur in the wild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryQuirks {
    /// Accept the invalid escape sequences Wine writes into its generated
    /// desktop files (lone backslashes and `\ `).
    pub extra_wine_escaping: bool,
    /// Accept runs of spaces as a single argument separator.
    pub multiple_spaces_in_exec: bool,
}

impl EntryQuirks {
    pub const ALL: EntryQuirks = EntryQuirks {
        extra_wine_escaping: true,
        multiple_spaces_in_exec: true,
    };

    pub const NONE: EntryQuirks = EntryQuirks {
        extra_wine_escaping: false,
        multiple_spaces_in_exec: false,
    };
}

/// Check that an Exec key contains only valid quoting.
///
/// Returns `None` for a valid key and a human-readable diagnostic otherwise.
/// Character positions in diagnostics are 1-based and count the Exec value
/// only (the `Exec=` prefix is not part of the input).
pub fn validate(exec: &str, quirks: EntryQuirks) -> Option<String> {
    let mut in_quotes = false;
    let chars: Vec<char> = exec.chars().collect();

    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if in_quotes {
            match ch {
                '\\' => {
                    if i == chars.len() - 1 {
                        return Some(
                            "escape character '\\' at end of field with nothing to escape"
                                .to_string(),
                        );
                    }
                    match chars[i + 1] {
                        '"' | '`' | '$' | '\\' => {}
                        other if !quirks.extra_wine_escaping => {
                            return Some(format!(
                                "invalid escape sequence '\\{}' on characters {}-{}",
                                other,
                                i + 1,
                                i + 2
                            ));
                        }
                        _ => {}
                    }
                    i += 1;
                }
                '"' => in_quotes = false,
                _ => {}
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                '\\' => {
                    if !quirks.extra_wine_escaping {
                        return Some(format!("unquoted escape character on character {}", i + 1));
                    }
                    if i == chars.len() - 1 {
                        return Some(
                            "escape character '\\' at end of field with nothing to escape"
                                .to_string(),
                        );
                    }
                    i += 1;
                }
                _ => {}
            }
        }
        i += 1;
    }

    if in_quotes {
        return Some("double-quoted string is missing its end quote".to_string());
    }
    None
}

/// Split an Exec key into its argument vector.
///
/// Quoting and escaping follow the desktop-entry specification, loosened by
/// whichever `quirks` are enabled. Each quirk that fires logs a warning once
/// per field. Field codes are left untouched; see [`expand`].
pub fn tokenize(exec: &str, quirks: EntryQuirks) -> Result<Vec<String>, ExecError> {
    let mut result = Vec::new();
    let mut curr = String::new();
    let mut in_quotes = false;
    let mut escaping = false;

    let mut warned_wine = false;
    let mut warned_spaces = false;

    for ch in exec.chars() {
        if escaping {
            match ch {
                '"' | '`' | '$' | '\\' => curr.push(ch),
                ' ' if quirks.extra_wine_escaping => curr.push(' '),
                other if quirks.extra_wine_escaping => {
                    // Wine writes backslashes that escape nothing; keep them.
                    curr.push('\\');
                    curr.push(other);
                }
                other => {
                    return Err(ExecError::InvalidExec(format!(
                        "invalid escape sequence '\\{other}'"
                    )));
                }
            }
            escaping = false;
        } else if in_quotes {
            match ch {
                '"' => in_quotes = false,
                '\\' => escaping = true,
                _ => curr.push(ch),
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                ' ' => {
                    if curr.is_empty() {
                        if quirks.multiple_spaces_in_exec && !warned_spaces {
                            warn!(
                                "Exec key separates arguments with multiple spaces; this does \
                                 not conform to the desktop-entry specification"
                            );
                            warned_spaces = true;
                        }
                        // Empty tokens are never emitted.
                    } else {
                        result.push(std::mem::take(&mut curr));
                    }
                }
                '\\' => {
                    if quirks.extra_wine_escaping {
                        if !warned_wine {
                            warn!(
                                "Exec key contains escape sequences outside double quotes; \
                                 this does not conform to the desktop-entry specification"
                            );
                            warned_wine = true;
                        }
                        escaping = true;
                    } else {
                        return Err(ExecError::InvalidExec(
                            "found '\\' outside double quotes".to_string(),
                        ));
                    }
                }
                _ => curr.push(ch),
            }
        }
    }

    if escaping {
        return Err(ExecError::InvalidExec(
            "escape character '\\' at end of field with nothing to escape".to_string(),
        ));
    }
    if in_quotes {
        return Err(ExecError::InvalidExec(
            "double-quoted string is missing its end quote".to_string(),
        ));
    }
    if !curr.is_empty() {
        result.push(curr);
    }

    Ok(result)
}

/// Launch-time context substituted for field codes.
pub struct FieldContext<'a> {
    /// Extra arguments the user typed after the display name.
    pub user_args: &'a str,
    /// The entry's icon name, if any.
    pub icon: Option<&'a str>,
    /// The entry's localized display name.
    pub name: &'a str,
    /// Absolute path of the desktop file the entry came from.
    pub entry_path: &'a Path,
}

const DEPRECATED_CODES: [&str; 6] = ["%d", "%D", "%n", "%N", "%v", "%m"];

/// Expand field codes in a tokenized Exec template.
///
/// Only tokens that consist of exactly one field code are substituted;
/// `%%` decodes to a literal `%` anywhere in a token. Deprecated codes are
/// dropped. Fails if nothing remains in the argv[0] position.
pub fn expand(tokens: &[String], ctx: &FieldContext) -> Result<Vec<String>, ExecError> {
    let mut argv = Vec::with_capacity(tokens.len());

    for token in tokens {
        match token.as_str() {
            "%f" | "%u" => {
                if !ctx.user_args.is_empty() {
                    argv.push(ctx.user_args.to_string());
                }
            }
            "%F" | "%U" => {
                argv.extend(ctx.user_args.split_whitespace().map(str::to_string));
            }
            "%i" => {
                if let Some(icon) = ctx.icon {
                    argv.push("--icon".to_string());
                    argv.push(icon.to_string());
                }
            }
            "%c" => argv.push(ctx.name.to_string()),
            "%k" => argv.push(ctx.entry_path.to_string_lossy().into_owned()),
            code if DEPRECATED_CODES.contains(&code) => {}
            _ => argv.push(token.replace("%%", "%")),
        }
    }

    if argv.is_empty() {
        return Err(ExecError::InvalidExec(
            "no argv[0] left after field-code expansion".to_string(),
        ));
    }
    Ok(argv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn ctx<'a>(args: &'a str) -> FieldContext<'a> {
        FieldContext {
            user_args: args,
            icon: None,
            name: "App",
            entry_path: Path::new("/usr/share/applications/app.desktop"),
        }
    }

    #[test]
    fn tokenize_plain() {
        let argv = tokenize("mpv --really-quiet", EntryQuirks::NONE).unwrap();
        assert_eq!(argv, vec!["mpv", "--really-quiet"]);
    }

    #[test]
    fn tokenize_quoted_spaces() {
        let argv = tokenize("editor \"some file\" -n", EntryQuirks::NONE).unwrap();
        assert_eq!(argv, vec!["editor", "some file", "-n"]);
    }

    #[test]
    fn tokenize_quoted_escapes() {
        let argv = tokenize(r#"sh "a\"b\$c\\d""#, EntryQuirks::NONE).unwrap();
        assert_eq!(argv, vec!["sh", "a\"b$c\\d"]);
    }

    #[test]
    fn tokenize_and_expand_quoted_field_code() {
        let tokens = tokenize("mpv --really-quiet \"%f\"", EntryQuirks::NONE).unwrap();
        let argv = expand(&tokens, &ctx("a b.mp4")).unwrap();
        assert_eq!(argv, vec!["mpv", "--really-quiet", "a b.mp4"]);
    }

    #[test]
    fn tokenize_rejects_unquoted_backslash() {
        assert!(tokenize(r"wine C:\foo", EntryQuirks::NONE).is_err());
    }

    #[test]
    fn tokenize_rejects_unterminated_quote() {
        assert!(tokenize("foo \"bar", EntryQuirks::NONE).is_err());
        assert!(validate("foo \"bar", EntryQuirks::NONE).is_some());
    }

    #[test]
    fn tokenize_rejects_trailing_escape() {
        assert!(tokenize("foo \"bar\\", EntryQuirks::NONE).is_err());
    }

    #[test]
    fn wine_quirk_parses_wine_paths() {
        // After general string decoding the field contains single
        // backslashes inside quotes, which only the quirk accepts.
        let exec = r#"wine start /unix "C:\Program Files\App\app.exe""#;
        assert!(validate(exec, EntryQuirks::NONE).is_some());
        assert!(validate(exec, EntryQuirks::ALL).is_none());

        assert!(tokenize(exec, EntryQuirks::NONE).is_err());
        let wine = EntryQuirks {
            extra_wine_escaping: true,
            multiple_spaces_in_exec: false,
        };
        let argv = tokenize(exec, wine).unwrap();
        assert_eq!(
            argv,
            vec!["wine", "start", "/unix", r"C:\Program Files\App\app.exe"]
        );
    }

    #[test]
    fn wine_quirk_escaped_space_outside_quotes() {
        let wine = EntryQuirks {
            extra_wine_escaping: true,
            multiple_spaces_in_exec: false,
        };
        let argv = tokenize(r"wine C:\\Program\ Files\\app.exe", wine).unwrap();
        assert_eq!(argv, vec!["wine", r"C:\Program Files\app.exe"]);
    }

    #[test]
    fn multiple_spaces_quirk() {
        let argv = tokenize("foo  bar", EntryQuirks::ALL).unwrap();
        assert_eq!(argv, vec!["foo", "bar"]);
        // Without the quirk empty tokens are still collapsed silently.
        let argv = tokenize("foo  bar", EntryQuirks::NONE).unwrap();
        assert_eq!(argv, vec!["foo", "bar"]);
    }

    #[test]
    fn expand_splits_multi_file_codes() {
        let tokens = tokenize("open %F", EntryQuirks::NONE).unwrap();
        let argv = expand(&tokens, &ctx("a b c")).unwrap();
        assert_eq!(argv, vec!["open", "a", "b", "c"]);
    }

    #[test]
    fn expand_icon_and_caption() {
        let tokens = tokenize("prog %i %c", EntryQuirks::NONE).unwrap();
        let context = FieldContext {
            user_args: "",
            icon: Some("prog-icon"),
            name: "Prog",
            entry_path: Path::new("/apps/prog.desktop"),
        };
        let argv = expand(&tokens, &context).unwrap();
        assert_eq!(argv, vec!["prog", "--icon", "prog-icon", "Prog"]);
    }

    #[test]
    fn expand_drops_icon_without_icon_name() {
        let tokens = tokenize("prog %i", EntryQuirks::NONE).unwrap();
        let argv = expand(&tokens, &ctx("")).unwrap();
        assert_eq!(argv, vec!["prog"]);
    }

    #[test]
    fn expand_source_path() {
        let tokens = tokenize("prog %k", EntryQuirks::NONE).unwrap();
        let argv = expand(&tokens, &ctx("")).unwrap();
        assert_eq!(argv, vec!["prog", "/usr/share/applications/app.desktop"]);
    }

    #[test]
    fn expand_removes_deprecated_codes() {
        let tokens = tokenize("prog %d %D %n %N %v %m last", EntryQuirks::NONE).unwrap();
        let argv = expand(&tokens, &ctx("")).unwrap();
        assert_eq!(argv, vec!["prog", "last"]);
    }

    #[test]
    fn expand_decodes_percent_mid_token() {
        let tokens = tokenize("prog --amount=100%% foo%fbar", EntryQuirks::NONE).unwrap();
        let argv = expand(&tokens, &ctx("x")).unwrap();
        // Mid-token field codes are not expanded, only %% decodes.
        assert_eq!(argv, vec!["prog", "--amount=100%", "foo%fbar"]);
    }

    #[test]
    fn expand_empty_user_args_contribute_nothing() {
        let tokens = tokenize("prog %f", EntryQuirks::NONE).unwrap();
        let argv = expand(&tokens, &ctx("")).unwrap();
        assert_eq!(argv, vec!["prog"]);
    }

    #[test]
    fn empty_exec_is_invalid() {
        let tokens = tokenize("", EntryQuirks::NONE).unwrap();
        assert!(tokens.is_empty());
        assert!(expand(&tokens, &ctx("")).is_err());
    }

    #[test]
    fn field_codes_only_is_invalid_without_args() {
        let tokens = tokenize("%f %u", EntryQuirks::NONE).unwrap();
        assert!(expand(&tokens, &ctx("")).is_err());
    }
}
