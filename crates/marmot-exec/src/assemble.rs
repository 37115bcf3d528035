//! Assembly of argument vectors into shell invocations.
//!
//! Quoting uses single quotes throughout. That style is uglier than double
//! quotes but survives more shells: the launcher executes through `/bin/sh`,
//! yet with `--no-exec` the user may paste the printed command into whatever
//! shell they run, and most non-exotic shells treat the contents of `'...'`
//! literally.

/// Quote a string so that a POSIX shell evaluates it back to the input.
///
/// Embedded single quotes become `'\''`; a trailing single quote is encoded
/// as `'\'` with no closing quote, which has the same effect one character
/// shorter.
pub fn sq_quote(input: &str) -> String {
    // Most strings contain no single quote, so wrapping them in '' is
    // enough; size for that case.
    let mut result = String::with_capacity(input.len() + 2);
    result.push('\'');

    let mut rest = input;
    loop {
        match rest.find('\'') {
            None => {
                result.push_str(rest);
                result.push('\'');
                return result;
            }
            Some(at) if at == rest.len() - 1 => {
                result.push_str(&rest[..at]);
                result.push_str("'\\'");
                return result;
            }
            Some(at) => {
                result.push_str(&rest[..at]);
                result.push_str("'\\''");
                rest = &rest[at + 1..];
            }
        }
    }
}

/// Join an argument vector into a single shell command string.
pub fn argv_to_string(command: &[String]) -> String {
    command
        .iter()
        .map(|arg| sq_quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pass a command string through a shell: `true` becomes
/// `["/bin/sh", "-c", "true"]`.
pub fn wrap_in_shell(cmdstring: &str) -> Vec<String> {
    vec![
        "/bin/sh".to_string(),
        "-c".to_string(),
        cmdstring.to_string(),
    ]
}

/// Prefix a command with a wrapper.
///
/// The wrapper string is re-evaluated by the inner shell, so multi-word
/// wrappers work; the wrapped command is passed through `"$@"` untouched.
pub fn wrap_in_wrapper(command: &[String], wrapper: &str) -> Vec<String> {
    let mut result = vec![
        "/bin/sh".to_string(),
        "-c".to_string(),
        "wrap=\"$1\"; shift; $wrap \"$@\"".to_string(),
        "/bin/sh".to_string(),
        wrapper.to_string(),
    ];
    result.extend(command.iter().cloned());
    result
}

/// How a command string should be turned into a final invocation.
pub struct InvocationOptions<'a> {
    /// The command comes from a desktop entry, not typed by the user.
    /// Desktop entries hold a single command, so the shell can safely
    /// replace itself with it; custom commands may contain arbitrary
    /// expressions and are run as-is.
    pub from_entry: bool,
    /// Terminal emulator command when the entry asks for a terminal.
    pub terminal: Option<&'a str>,
    /// The user's shell (`$SHELL`, falling back to `/bin/sh`).
    pub shell: &'a str,
    /// Wrapper command prefix, if any.
    pub wrapper: Option<&'a str>,
}

/// A fully assembled launch.
pub struct Invocation {
    /// Argument vector ready to execute.
    pub argv: Vec<String>,
    /// The same launch as a single command string, for routing over a
    /// window-manager IPC socket.
    pub ipc_payload: String,
}

/// Assemble the final invocation for a selected command string.
///
/// Some shells exec() the last command of `-c` themselves and some (dash)
/// leave a shell process behind, hence the explicit `exec ` prefix for
/// desktop entries.
pub fn build_invocation(cmdstring: &str, opts: &InvocationOptions) -> Invocation {
    let cmd = if opts.from_entry {
        format!("exec {cmdstring}")
    } else {
        cmdstring.to_string()
    };

    let inner = match opts.terminal {
        Some(term) => vec![
            term.to_string(),
            "-e".to_string(),
            opts.shell.to_string(),
            "-c".to_string(),
            cmd.clone(),
        ],
        None => vec![opts.shell.to_string(), "-c".to_string(), cmd.clone()],
    };

    // The IPC payload must be one string, so the wrapper is applied
    // textually there.
    let payload_cmd = match opts.wrapper {
        Some(wrapper) => format!("{wrapper} {}", sq_quote(&cmd)),
        None => cmd,
    };
    let ipc_payload = match opts.terminal {
        Some(term) => argv_to_string(&[
            term.to_string(),
            "-e".to_string(),
            opts.shell.to_string(),
            "-c".to_string(),
            payload_cmd,
        ]),
        None => payload_cmd,
    };

    let argv = match opts.wrapper {
        Some(wrapper) => wrap_in_wrapper(&inner, wrapper),
        None => inner,
    };

    Invocation { argv, ipc_payload }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sq_quote_plain() {
        assert_eq!(sq_quote("plain"), "'plain'");
    }

    #[test]
    fn sq_quote_embedded_quote() {
        assert_eq!(sq_quote("it's a test"), r"'it'\''s a test'");
    }

    #[test]
    fn sq_quote_trailing_quote() {
        assert_eq!(sq_quote("end'"), r"'end'\'");
    }

    #[test]
    fn sq_quote_only_quotes() {
        assert_eq!(sq_quote("''"), r"''\'''\'");
        assert_eq!(sq_quote(""), "''");
    }

    #[test]
    fn argv_join() {
        let argv = vec!["mpv".to_string(), "a b.mp4".to_string()];
        assert_eq!(argv_to_string(&argv), "'mpv' 'a b.mp4'");
        assert_eq!(argv_to_string(&[]), "");
    }

    #[test]
    fn shell_wrap() {
        assert_eq!(wrap_in_shell("true"), vec!["/bin/sh", "-c", "true"]);
    }

    #[test]
    fn wrapper_wrap_shape() {
        let command = vec!["prog".to_string(), "arg".to_string()];
        let wrapped = wrap_in_wrapper(&command, "env FOO=1");
        assert_eq!(
            wrapped,
            vec![
                "/bin/sh",
                "-c",
                "wrap=\"$1\"; shift; $wrap \"$@\"",
                "/bin/sh",
                "env FOO=1",
                "prog",
                "arg",
            ]
        );
    }

    #[test]
    fn invocation_plain_entry() {
        let inv = build_invocation(
            "'mpv' 'file.mp4'",
            &InvocationOptions {
                from_entry: true,
                terminal: None,
                shell: "/bin/bash",
                wrapper: None,
            },
        );
        assert_eq!(inv.argv, vec!["/bin/bash", "-c", "exec 'mpv' 'file.mp4'"]);
        assert_eq!(inv.ipc_payload, "exec 'mpv' 'file.mp4'");
    }

    #[test]
    fn invocation_custom_command_not_execed() {
        let inv = build_invocation(
            "ls | wc -l",
            &InvocationOptions {
                from_entry: false,
                terminal: None,
                shell: "/bin/sh",
                wrapper: None,
            },
        );
        assert_eq!(inv.argv, vec!["/bin/sh", "-c", "ls | wc -l"]);
    }

    #[test]
    fn invocation_terminal_entry() {
        let inv = build_invocation(
            "'htop'",
            &InvocationOptions {
                from_entry: true,
                terminal: Some("xterm"),
                shell: "/bin/sh",
                wrapper: None,
            },
        );
        assert_eq!(
            inv.argv,
            vec!["xterm", "-e", "/bin/sh", "-c", "exec 'htop'"]
        );
        assert_eq!(
            inv.ipc_payload,
            "'xterm' '-e' '/bin/sh' '-c' 'exec '\\''htop'\\'"
        );
    }

    #[test]
    fn invocation_with_wrapper() {
        let inv = build_invocation(
            "'prog'",
            &InvocationOptions {
                from_entry: true,
                terminal: None,
                shell: "/bin/sh",
                wrapper: Some("firejail"),
            },
        );
        assert_eq!(
            inv.argv,
            vec![
                "/bin/sh",
                "-c",
                "wrap=\"$1\"; shift; $wrap \"$@\"",
                "/bin/sh",
                "firejail",
                "/bin/sh",
                "-c",
                "exec 'prog'",
            ]
        );
        assert_eq!(inv.ipc_payload, "firejail 'exec '\\''prog'\\'");
    }
}
