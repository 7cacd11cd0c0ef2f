//! Control-channel client for the hostapd daemon.
//!
//! command: typed builder for control-interface command text
//! socket: one-shot datagram request/response with bounded wait

pub mod command;
pub mod socket;

pub use command::{AuthConf, DaemonCommand};
pub use socket::{CtrlError, CtrlResponse, send_command};
