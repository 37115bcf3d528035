//! The external menu program.
//!
//! The menu is a line-oriented child process: we pipe display names into its
//! stdin, it prints the user's choice on stdout. An empty line or EOF means
//! the user cancelled.

use std::io::{self, BufWriter, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};

use log::{debug, info};

/// Configuration for spawning menu processes.
pub struct Menu {
    command: String,
    shell: String,
}

impl Menu {
    pub fn new(command: String, shell: String) -> Self {
        Menu { command, shell }
    }

    /// Spawn one menu process with piped stdin/stdout.
    pub fn spawn(&self) -> io::Result<MenuSession> {
        debug!("spawning menu: {} -c {}", self.shell, self.command);
        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        let stdin = child.stdin.take().expect("menu stdin is piped");
        Ok(MenuSession {
            child,
            stdin: Some(BufWriter::new(stdin)),
        })
    }
}

/// One running menu process.
pub struct MenuSession {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
}

impl MenuSession {
    /// Write one display key followed by LF.
    ///
    /// A `BrokenPipe` error here means the menu process died or never
    /// started reading; the caller turns that into a fatal diagnostic.
    pub fn write_key(&mut self, key: &str) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .expect("keys are written before the choice is read");
        stdin.write_all(key.as_bytes())?;
        stdin.write_all(b"\n")
    }

    /// Close the menu's stdin and block until it answers.
    ///
    /// Returns `None` when the user cancelled (empty line or EOF).
    pub fn read_choice(mut self) -> io::Result<Option<String>> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.flush()?;
            // Dropping the writer closes the pipe; the menu sees EOF and
            // presents its list.
        }

        let mut output = String::new();
        self.child
            .stdout
            .take()
            .expect("menu stdout is piped")
            .read_to_string(&mut output)?;
        self.child.wait()?;

        let choice = output.lines().next().unwrap_or("").to_string();
        if choice.is_empty() {
            return Ok(None);
        }
        info!("user input is: {choice}");
        Ok(Some(choice))
    }
}
