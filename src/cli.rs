//! Command-line surface.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use marmot_exec::EntryQuirks;

#[derive(Parser, Debug)]
#[command(
    name = "marmotmenu",
    version,
    about = "Fast launcher for desktop applications through a dmenu-style menu",
    after_help = "Any line typed into the menu that matches no application \
                  is executed as a shell command."
)]
pub struct Args {
    /// Command used to invoke the menu program.
    #[arg(short = 'd', long = "menu", value_name = "COMMAND", default_value = "dmenu -i")]
    pub menu: String,

    /// Terminal emulator used to start Terminal=true applications.
    #[arg(
        short = 't',
        long = "term",
        value_name = "COMMAND",
        default_value = "i3-sensible-terminal"
    )]
    pub term: String,

    /// Wrapper command the selected application is launched through.
    #[arg(long, value_name = "COMMAND")]
    pub wrapper: Option<String>,

    /// Print the selected command instead of executing it.
    #[arg(long)]
    pub no_exec: bool,

    /// Do not append the generic name of desktop entries.
    #[arg(long)]
    pub no_generic: bool,

    /// Display the Exec binary after each entry.
    #[arg(short = 'b', long, conflicts_with = "display_binary_base")]
    pub display_binary: bool,

    /// Display the basename of the Exec binary after each entry.
    #[arg(short = 'f', long)]
    pub display_binary_base: bool,

    /// Match menu input against display names case-insensitively.
    #[arg(short = 'i', long)]
    pub case_insensitive: bool,

    /// Usage log path; enables sorting by usage frequency.
    #[arg(long, value_name = "FILE")]
    pub usage_log: Option<PathBuf>,

    /// Enable daemon mode with a control FIFO at the given path.
    #[arg(long, value_name = "PATH")]
    pub wait_on: Option<PathBuf>,

    /// Execute applications through the window manager's IPC socket.
    #[arg(short = 'I', long = "wm-ipc")]
    pub wm_ipc: bool,

    /// Disable the safety check for wrappers that should use -I instead.
    #[arg(long)]
    pub skip_wrapper_check: bool,

    /// Read $XDG_CURRENT_DESKTOP to filter entries by desktop environment.
    #[arg(short = 'x', long)]
    pub use_xdg_de: bool,

    /// Lenient parsing of non-conforming desktop files.
    #[arg(
        long,
        value_enum,
        value_name = "QUIRKS",
        value_delimiter = ',',
        default_value = "all"
    )]
    pub entry_quirks: Vec<QuirkArg>,

    /// Be more verbose (-v: info, -vv: debug).
    #[arg(short = 'v', action = ArgAction::Count)]
    pub verbose: u8,

    /// Set the log level explicitly.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LevelArg>,

    /// Write log output to a file instead of stderr.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn quirks(&self) -> EntryQuirks {
        let mut quirks = EntryQuirks::NONE;
        for arg in &self.entry_quirks {
            match arg {
                QuirkArg::All => quirks = EntryQuirks::ALL,
                QuirkArg::None => quirks = EntryQuirks::NONE,
                QuirkArg::WineEscaping => quirks.extra_wine_escaping = true,
                QuirkArg::MultipleSpaces => quirks.multiple_spaces_in_exec = true,
            }
        }
        quirks
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuirkArg {
    All,
    None,
    WineEscaping,
    MultipleSpaces,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelArg {
    Error,
    Warning,
    Info,
    Debug,
}

impl From<LevelArg> for log::LevelFilter {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Error => log::LevelFilter::Error,
            LevelArg::Warning => log::LevelFilter::Warn,
            LevelArg::Info => log::LevelFilter::Info,
            LevelArg::Debug => log::LevelFilter::Debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["marmotmenu"]);
        assert_eq!(args.menu, "dmenu -i");
        assert_eq!(args.term, "i3-sensible-terminal");
        assert_eq!(args.quirks(), EntryQuirks::ALL);
        assert!(!args.case_insensitive);
    }

    #[test]
    fn quirk_selection() {
        let args = Args::parse_from(["marmotmenu", "--entry-quirks", "none"]);
        assert_eq!(args.quirks(), EntryQuirks::NONE);

        let args = Args::parse_from(["marmotmenu", "--entry-quirks", "wine-escaping"]);
        assert!(args.quirks().extra_wine_escaping);
        assert!(!args.quirks().multiple_spaces_in_exec);

        let args = Args::parse_from([
            "marmotmenu",
            "--entry-quirks",
            "wine-escaping,multiple-spaces",
        ]);
        assert_eq!(args.quirks(), EntryQuirks::ALL);
    }

    #[test]
    fn binary_display_flags_conflict() {
        assert!(Args::try_parse_from(["marmotmenu", "-b", "-f"]).is_err());
    }
}
