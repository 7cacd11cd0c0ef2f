//! Typed builder for hostapd control-interface command text.
//!
//! Every datagram sent to the daemon is rendered from a DaemonCommand, so
//! wire strings are assembled in exactly one place instead of scattered
//! format calls. Rendering is byte-for-byte what hostapd parses.

use std::fmt;

/// One hostapd control-interface command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonCommand {
    /// Liveness probe
    Ping,
    /// Full daemon status dump
    Status,
    /// Command list (used to detect DPP support)
    Help,
    /// Adjust daemon log verbosity
    LogLevel { level: String },
    /// Create a configurator identity; `key` (a private key blob) wins
    /// over `curve` when both are given, matching the daemon's precedence.
    ConfiguratorAdd {
        curve: Option<String>,
        key: Option<String>,
    },
    /// Export a configurator's key
    ConfiguratorGetKey { id: u32 },
    /// Generate local QR-code bootstrap material
    BootstrapGen {
        curve: String,
        key: Option<String>,
    },
    /// Fetch the URI for a bootstrap id
    BootstrapGetUri { id: u32 },
    /// Detailed bootstrap record dump
    BootstrapInfo { id: u32 },
    /// Register a peer's scanned QR-code URI
    QrCode { uri: String },
    /// Start DPP authentication as configurator
    AuthInit {
        peer: u32,
        configurator: u32,
        conf: AuthConf,
    },
    /// Listen for DPP frames on a frequency (MHz)
    Listen { freq: u32 },
    /// Stop listening
    StopListen,
}

/// Configuration payload for AuthInit.
///
/// hostapd accepts either a single-quoted JSON blob or discrete conf/ssid/
/// pass parameters; ssid and pass must already be hex-encoded here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthConf {
    Json {
        conf_json: String,
    },
    Params {
        conf: String,
        ssid_hex: Option<String>,
        pass_hex: Option<String>,
        matter_pin: Option<String>,
    },
}

impl fmt::Display for DaemonCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonCommand::Ping => write!(f, "PING"),
            DaemonCommand::Status => write!(f, "STATUS"),
            DaemonCommand::Help => write!(f, "HELP"),
            DaemonCommand::LogLevel { level } => write!(f, "LOG_LEVEL {}", level),
            DaemonCommand::ConfiguratorAdd { curve, key } => match (key, curve) {
                (Some(key), _) => write!(f, "DPP_CONFIGURATOR_ADD key={}", key),
                (None, Some(curve)) => write!(f, "DPP_CONFIGURATOR_ADD curve={}", curve),
                (None, None) => write!(f, "DPP_CONFIGURATOR_ADD"),
            },
            DaemonCommand::ConfiguratorGetKey { id } => {
                write!(f, "DPP_CONFIGURATOR_GET_KEY {}", id)
            }
            DaemonCommand::BootstrapGen { curve, key } => {
                write!(f, "DPP_BOOTSTRAP_GEN type=qrcode curve={}", curve)?;
                if let Some(key) = key {
                    write!(f, " key={}", key)?;
                }
                Ok(())
            }
            DaemonCommand::BootstrapGetUri { id } => write!(f, "DPP_BOOTSTRAP_GET_URI {}", id),
            DaemonCommand::BootstrapInfo { id } => write!(f, "DPP_BOOTSTRAP_INFO {}", id),
            DaemonCommand::QrCode { uri } => write!(f, "DPP_QR_CODE {}", uri),
            DaemonCommand::AuthInit {
                peer,
                configurator,
                conf,
            } => {
                write!(f, "DPP_AUTH_INIT peer={} configurator={}", peer, configurator)?;
                match conf {
                    AuthConf::Json { conf_json } => write!(f, " conf_json='{}'", conf_json),
                    AuthConf::Params {
                        conf,
                        ssid_hex,
                        pass_hex,
                        matter_pin,
                    } => {
                        write!(f, " conf={}", conf)?;
                        // ssid and pass travel together; matter_pin is last
                        if let (Some(ssid), Some(pass)) = (ssid_hex, pass_hex) {
                            write!(f, " ssid={} pass={}", ssid, pass)?;
                        }
                        if let Some(pin) = matter_pin {
                            write!(f, " matter_pin={}", pin)?;
                        }
                        Ok(())
                    }
                }
            }
            DaemonCommand::Listen { freq } => write!(f, "DPP_LISTEN {}", freq),
            DaemonCommand::StopListen => write!(f, "DPP_STOP_LISTEN"),
        }
    }
}
