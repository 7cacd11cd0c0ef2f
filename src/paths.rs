//! Centralized path resolution for dppctl
//!
//! Single source of truth for all socket, state and log file paths.
//! Directories come from Config (DPPCTL_* env vars with system defaults).

use crate::config::Config;
use std::path::PathBuf;

/// Log file name under runtime_dir (shared with the logger, which resolves
/// the directory without going through Config::get()).
pub const LOG_FILE_NAME: &str = "dppctl.log";

/// Get the hostapd control socket path for an interface
/// (ctrl_dir/<interface>, e.g. /var/run/hostapd/wlan0).
pub fn ctrl_socket_path(interface: &str) -> PathBuf {
    Config::get().ctrl_dir.join(interface)
}

/// Get the ephemeral client reply socket path (runtime_dir/dppctl_<pid>).
///
/// Derived from the process id so concurrent invocations never collide;
/// created and unlinked within a single control-channel call.
pub fn client_socket_path() -> PathBuf {
    Config::get()
        .runtime_dir
        .join(format!("dppctl_{}", std::process::id()))
}

/// Get the association state file path.
pub fn state_file_path() -> PathBuf {
    Config::get().state_file
}

/// Get the log file path (runtime_dir/dppctl.log).
pub fn log_path() -> PathBuf {
    Config::get().runtime_dir.join(LOG_FILE_NAME)
}
