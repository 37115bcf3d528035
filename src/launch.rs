//! Process execution for assembled invocations.

use std::io;
use std::path::Path;
use std::process::Command;

use log::debug;

/// Replace this process with the invocation (one-shot mode).
///
/// Only returns if exec failed.
pub fn exec_replace(argv: &[String], workdir: Option<&Path>) -> io::Error {
    use std::os::unix::process::CommandExt;

    debug!("exec: {argv:?}");
    let mut command = Command::new(&argv[0]);
    command.args(&argv[1..]);
    if let Some(dir) = workdir {
        command.current_dir(dir);
    }
    command.exec()
}

/// Spawn the invocation detached from the daemon (daemon mode).
///
/// The child calls `setsid` before exec so it survives the daemon and gets
/// reparented instead of becoming a zombie of a dead session; the daemon's
/// SIGCHLD handling reaps the direct child when it exits.
pub fn spawn_detached(argv: &[String], workdir: Option<&Path>) -> io::Result<()> {
    use std::os::unix::process::CommandExt;

    debug!("spawning: {argv:?}");
    let mut command = Command::new(&argv[0]);
    command.args(&argv[1..]);
    if let Some(dir) = workdir {
        command.current_dir(dir);
    }
    unsafe {
        command.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
    command.spawn()?;
    Ok(())
}
