//! One-shot datagram exchange with a hostapd control socket.
//!
//! hostapd's control interface is a UNIX datagram socket: the client binds
//! its own ephemeral address so the daemon can route the reply back, sends
//! one command datagram, and waits (bounded) for one reply datagram. The
//! ephemeral address file and the socket fd are released on every exit path.

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use std::io;
use std::os::fd::{AsFd, AsRawFd, FromRawFd, OwnedFd};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::log::{log_error, log_info};
use crate::paths;

use super::command::DaemonCommand;

/// Fixed wall-clock bound on one request/response exchange.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);
/// Receive buffer size; longer daemon replies are truncated.
pub const MAX_RESPONSE_SIZE: usize = 4096;
/// Practical limit of the daemon's command parser.
pub const MAX_COMMAND_LEN: usize = 512;

/// The daemon's reply to one command. Ephemeral; lossily decoded text.
#[derive(Debug, Clone)]
pub struct CtrlResponse {
    pub text: String,
}

/// Error types for control-channel communication.
///
/// Each failure point of the exchange is a distinct variant so the command
/// layer can report exactly where a call died.
#[derive(Debug, thiserror::Error)]
pub enum CtrlError {
    /// Daemon control socket missing on disk. Nothing was created.
    #[error("control socket not found: {0} (is hostapd running with ctrl_interface enabled?)")]
    EndpointNotFound(PathBuf),

    /// Command text violates the transport preconditions (too long,
    /// embedded NUL or newline). Indicates a builder bug, not a daemon fault.
    #[error("invalid command text: {0}")]
    InvalidCommand(String),

    /// Socket path exceeds sun_path capacity.
    #[error("socket path too long: {0}")]
    AddressTooLong(PathBuf),

    #[error("failed to create socket: {0}")]
    ChannelCreate(#[source] io::Error),

    #[error("failed to bind reply socket: {0}")]
    Bind(#[source] io::Error),

    #[error("failed to send command: {0}")]
    Send(#[source] io::Error),

    /// The daemon sent nothing within the timeout. The command may still
    /// have been executed daemon-side.
    #[error("timed out after {0:?} waiting for daemon response")]
    Timeout(Duration),

    #[error("wait on control socket failed: {0}")]
    Wait(#[source] nix::Error),

    #[error("failed to receive response: {0}")]
    Receive(#[source] io::Error),
}

/// Removes the ephemeral reply socket path on drop, so bind/send/wait
/// failures and successes all unlink the file exactly once.
struct ReplyPathGuard<'a> {
    path: &'a Path,
}

impl Drop for ReplyPathGuard<'_> {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(self.path);
    }
}

/// Build a sockaddr_un for a filesystem path.
fn sockaddr_for(path: &Path) -> Result<libc::sockaddr_un, CtrlError> {
    let path_bytes = path.as_os_str().as_encoded_bytes();
    // sun_path size varies by platform (104 on macOS, 108 on Linux)
    let max_path_len = std::mem::size_of::<libc::sockaddr_un>()
        - std::mem::size_of::<libc::sa_family_t>()
        - 1; // -1 for null terminator
    if path_bytes.len() >= max_path_len {
        return Err(CtrlError::AddressTooLong(path.to_path_buf()));
    }

    // SAFETY: Zero-initializes sockaddr_un struct.
    // - sockaddr_un is a C struct with no Rust invariants
    // - mem::zeroed() produces a valid all-zero sockaddr_un
    // - sun_family is set to AF_UNIX immediately after
    let mut addr: libc::sockaddr_un = unsafe { std::mem::zeroed() };
    addr.sun_family = libc::AF_UNIX as libc::sa_family_t;

    // SAFETY: Copies socket path bytes into sockaddr_un.sun_path.
    // - path_bytes is valid: from OsStr::as_encoded_bytes()
    // - Length is validated above: path_bytes.len() < max_path_len
    // - Remaining bytes stay zero (from mem::zeroed), providing null terminator
    unsafe {
        std::ptr::copy_nonoverlapping(
            path_bytes.as_ptr(),
            addr.sun_path.as_mut_ptr() as *mut u8,
            path_bytes.len(),
        );
    }

    Ok(addr)
}

/// Perform one synchronous command/response exchange.
///
/// `ctrl_path` is the daemon's socket, `reply_path` the ephemeral client
/// address. The reply path is unlinked and the socket closed before this
/// function returns, on every path. No retries; the caller decides.
pub fn exchange(
    ctrl_path: &Path,
    reply_path: &Path,
    command_text: &str,
    max_response_bytes: usize,
    timeout: Duration,
) -> Result<CtrlResponse, CtrlError> {
    // Check the endpoint before creating anything, so a dead daemon fails
    // fast with no filesystem side effects.
    if !ctrl_path.exists() {
        return Err(CtrlError::EndpointNotFound(ctrl_path.to_path_buf()));
    }

    if command_text.len() > MAX_COMMAND_LEN
        || command_text.contains('\0')
        || command_text.contains('\n')
    {
        return Err(CtrlError::InvalidCommand(format!(
            "{} bytes, single line ≤{} required",
            command_text.len(),
            MAX_COMMAND_LEN
        )));
    }

    let dest = sockaddr_for(ctrl_path)?;
    let local = sockaddr_for(reply_path)?;
    let addr_len = std::mem::size_of::<libc::sockaddr_un>() as libc::socklen_t;

    // SAFETY: Creates a UNIX datagram socket.
    // - AF_UNIX and SOCK_DGRAM are valid socket parameters
    // - Return value is checked: fd < 0 indicates error
    // - On success the fd is immediately wrapped in OwnedFd, which closes
    //   it on drop (every exit path below)
    let sock = unsafe {
        let fd = libc::socket(libc::AF_UNIX, libc::SOCK_DGRAM, 0);
        if fd < 0 {
            return Err(CtrlError::ChannelCreate(io::Error::last_os_error()));
        }
        OwnedFd::from_raw_fd(fd)
    };

    // Remove a stale address left by a crashed previous run before binding.
    let _ = std::fs::remove_file(reply_path);

    // From here on the reply path must be unlinked however we exit.
    let _cleanup = ReplyPathGuard { path: reply_path };

    // SAFETY: Binds the socket to the ephemeral reply address.
    // - sock is a valid fd owned above
    // - local is a properly initialized sockaddr_un
    // - Return value checked; guard unlinks the path on the error path
    let ret = unsafe {
        libc::bind(
            sock.as_raw_fd(),
            &local as *const libc::sockaddr_un as *const libc::sockaddr,
            addr_len,
        )
    };
    if ret < 0 {
        return Err(CtrlError::Bind(io::Error::last_os_error()));
    }

    // SAFETY: Sends the command as a single datagram to the daemon address.
    // - sock is valid and bound
    // - command_text pointer/length come from a valid &str
    // - dest is a properly initialized sockaddr_un
    let sent = unsafe {
        libc::sendto(
            sock.as_raw_fd(),
            command_text.as_ptr() as *const libc::c_void,
            command_text.len(),
            0,
            &dest as *const libc::sockaddr_un as *const libc::sockaddr,
            addr_len,
        )
    };
    if sent < 0 {
        return Err(CtrlError::Send(io::Error::last_os_error()));
    }

    // Wait for the reply datagram. Three outcomes: ready, timeout, error.
    let timeout_ms = timeout.as_millis().min(u128::from(u16::MAX)) as u16;
    let mut fds = [PollFd::new(sock.as_fd(), PollFlags::POLLIN)];
    match poll(&mut fds, PollTimeout::from(timeout_ms)) {
        Err(e) => return Err(CtrlError::Wait(e)),
        Ok(0) => return Err(CtrlError::Timeout(timeout)),
        Ok(_) => {}
    }

    let mut buf = vec![0u8; max_response_bytes];
    // SAFETY: Receives one datagram into buf.
    // - sock is valid; poll reported data ready
    // - buf pointer/length describe a live, writable allocation
    // - A reply longer than buf is truncated by the kernel
    let received = unsafe {
        libc::recv(
            sock.as_raw_fd(),
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
            0,
        )
    };
    if received < 0 {
        return Err(CtrlError::Receive(io::Error::last_os_error()));
    }
    buf.truncate(received as usize);

    Ok(CtrlResponse {
        text: String::from_utf8_lossy(&buf).into_owned(),
    })
}

/// Send one typed command to the daemon instance behind `interface`,
/// with the fixed timeout and response bound.
pub fn send_command(interface: &str, command: &DaemonCommand) -> Result<CtrlResponse, CtrlError> {
    let text = command.to_string();
    let ctrl_path = paths::ctrl_socket_path(interface);
    let reply_path = paths::client_socket_path();

    log_info(
        "ctrl",
        "send",
        &format!("interface={} cmd={}", interface, text),
    );

    let result = exchange(
        &ctrl_path,
        &reply_path,
        &text,
        MAX_RESPONSE_SIZE,
        RESPONSE_TIMEOUT,
    );

    match &result {
        Ok(response) => log_info(
            "ctrl",
            "recv",
            &format!("interface={} response_len={}", interface, response.text.len()),
        ),
        Err(e) => log_error("ctrl", "exchange_failed", &format!("interface={} err={}", interface, e)),
    }

    result
}
