//! marmot-wm: window-manager IPC routing.
//!
//! Sends launch commands over the i3 IPC socket instead of executing them
//! locally. Only the "run command" message is needed; replies are not read.

use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

/// Magic bytes opening every IPC message.
const IPC_MAGIC: &[u8; 6] = b"i3-ipc";

/// Message type for "run command".
const RUN_COMMAND: u32 = 0;

/// Errors talking to the window manager.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("cannot determine the IPC socket path: {0}")]
    Discovery(String),

    #[error("IPC I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Locate the IPC socket: `$I3SOCK` if set, otherwise ask the window
/// manager through its discovery command.
pub fn socket_path() -> Result<PathBuf, IpcError> {
    if let Some(path) = std::env::var_os("I3SOCK") {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let output = Command::new("i3")
        .arg("--get-socketpath")
        .output()
        .map_err(|err| IpcError::Discovery(format!("failed to run i3 --get-socketpath: {err}")))?;
    if !output.status.success() {
        return Err(IpcError::Discovery(
            "i3 --get-socketpath exited with an error; is i3 running?".to_string(),
        ));
    }
    let path = String::from_utf8_lossy(&output.stdout);
    let path = path.trim();
    if path.is_empty() {
        return Err(IpcError::Discovery(
            "i3 --get-socketpath printed nothing".to_string(),
        ));
    }
    Ok(PathBuf::from(path))
}

/// Send a command string to the window manager for execution.
pub fn run_command(socket: &Path, payload: &str) -> Result<(), IpcError> {
    debug!("sending command over IPC: {payload}");
    let mut stream = UnixStream::connect(socket)?;
    stream.write_all(&encode_message(RUN_COMMAND, payload))?;
    // The reply is not interesting; drop the connection.
    Ok(())
}

/// Frame a payload: 6 magic bytes, u32 LE payload length, u32 LE type.
fn encode_message(message_type: u32, payload: &str) -> Vec<u8> {
    let bytes = payload.as_bytes();
    let mut message = Vec::with_capacity(14 + bytes.len());
    message.extend_from_slice(IPC_MAGIC);
    message.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    message.extend_from_slice(&message_type.to_le_bytes());
    message.extend_from_slice(bytes);
    message
}
