//! CLI command handlers for dppctl
//!
//! Each handler formats typed daemon commands, drives the control channel,
//! interprets the reply by substring, and keeps the association store in
//! sync so created ids survive daemon restarts. Handlers print
//! human-readable text; errors propagate to main for the exit code.

use anyhow::{Context, Result, anyhow, bail};
use std::time::Duration;

use crate::ctrl::{self, AuthConf, DaemonCommand};
use crate::log::log_warn;
use crate::store::{AssociationStore, RecordKind, StoreError};
use crate::util;

/// Curve used when the caller does not name one, same default as hostapd.
const DEFAULT_CURVE: &str = "prime256v1";

/// auth_monitor poll cadence and default overall timeout.
const MONITOR_INTERVAL: Duration = Duration::from_secs(2);
const MONITOR_DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Known-good URI for the debug_dpp probe sequence.
const SAMPLE_QR_URI: &str =
    "DPP:C:81/6;M:54:32:04:1f:b5:a8;K:MDkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDIgACCcWFqRtN+f0loEUgGIXDnMXPrjl92u2pV97Ff6DjUD8=;;";

/// Per-invocation context.
pub struct Ctx {
    pub verbose: bool,
}

/// One CLI subcommand: name, handler, help line.
pub struct CommandSpec {
    pub name: &'static str,
    pub handler: fn(&Ctx, &str) -> Result<()>,
    pub help: &'static str,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "configurator_add",
        handler: cmd_configurator_add,
        help: "Add configurator (interface= [curve=] [key=])",
    },
    CommandSpec {
        name: "bootstrap_gen",
        handler: cmd_bootstrap_gen,
        help: "Generate bootstrap (interface= type=qr [curve=] [key=])",
    },
    CommandSpec {
        name: "bootstrap_get_uri",
        handler: cmd_bootstrap_get_uri,
        help: "Get bootstrap URI (interface= id=)",
    },
    CommandSpec {
        name: "qr_code",
        handler: cmd_qr_code,
        help: "Register peer QR code (interface= DPP:<uri>)",
    },
    CommandSpec {
        name: "auth_init",
        handler: cmd_auth_init,
        help: "Initiate authentication (interface= peer= configurator= [conf=] [ssid=] [pass=] [matter_pin=] [conf_json=])",
    },
    CommandSpec {
        name: "auth_monitor",
        handler: cmd_auth_monitor,
        help: "Monitor authentication progress (interface= [timeout=])",
    },
    CommandSpec {
        name: "status",
        handler: cmd_status,
        help: "Show status ([interface=])",
    },
    CommandSpec {
        name: "test_hostapd",
        handler: cmd_test_hostapd,
        help: "Test daemon connectivity (interface=)",
    },
    CommandSpec {
        name: "debug_dpp",
        handler: cmd_debug_dpp,
        help: "Probe daemon DPP support (interface=)",
    },
    CommandSpec {
        name: "help",
        handler: cmd_help,
        help: "Show help",
    },
];

/// Dispatch a subcommand by name.
pub fn execute(ctx: &Ctx, name: &str, args: &str) -> Result<()> {
    match COMMANDS.iter().find(|spec| spec.name == name) {
        Some(spec) => (spec.handler)(ctx, args),
        None => bail!("unknown command: {} (use 'help' to list commands)", name),
    }
}

fn require_interface(args: &str) -> Result<String> {
    util::arg(args, "interface").ok_or_else(|| anyhow!("interface parameter required"))
}

fn require_id(args: &str, key: &str) -> Result<u32> {
    util::arg(args, key)
        .ok_or_else(|| anyhow!("{} parameter required", key))?
        .parse()
        .map_err(|_| anyhow!("{} must be a non-negative integer", key))
}

/// The daemon answers create commands with the new id as bare decimal text.
fn parse_id(response: &str) -> Option<u32> {
    response.trim().parse().ok()
}

fn is_fail(response: &str) -> bool {
    response.contains("FAIL")
}

/// Persist a freshly created association; daemon-side creation already
/// succeeded, so a store failure is reported but does not fail the command.
fn remember(kind: RecordKind, id: u32, value: &str) {
    let store = AssociationStore::open();
    if let Err(e) = store.upsert(kind, id, value) {
        log_warn(
            "commands",
            "store_upsert_failed",
            &format!("{} {}: {}", kind, id, e),
        );
        eprintln!("Warning: failed to persist {} {}: {}", kind, id, e);
    }
}

fn cmd_configurator_add(ctx: &Ctx, args: &str) -> Result<()> {
    if ctx.verbose {
        println!("Processing configurator_add command: {}", args);
    }
    let interface = require_interface(args)?;
    let key = util::arg(args, "key");
    let curve = util::arg(args, "curve").unwrap_or_else(|| DEFAULT_CURVE.to_string());

    let response = ctrl::send_command(
        &interface,
        &DaemonCommand::ConfiguratorAdd {
            curve: Some(curve.clone()),
            key,
        },
    )?;
    let id = parse_id(&response.text)
        .ok_or_else(|| anyhow!("daemon rejected configurator_add: {}", response.text.trim()))?;

    remember(RecordKind::Configurator, id, &curve);
    println!("Configurator added with ID: {}", id);
    Ok(())
}

fn cmd_bootstrap_gen(ctx: &Ctx, args: &str) -> Result<()> {
    if ctx.verbose {
        println!("Processing bootstrap_gen command: {}", args);
    }
    let interface = require_interface(args)?;
    if util::arg(args, "type").as_deref() != Some("qr") {
        bail!("only type=qr is supported");
    }
    let curve = util::arg(args, "curve").unwrap_or_else(|| DEFAULT_CURVE.to_string());
    let key = util::arg(args, "key");

    let response = ctrl::send_command(&interface, &DaemonCommand::BootstrapGen { curve, key })?;
    let id = parse_id(&response.text)
        .ok_or_else(|| anyhow!("daemon rejected bootstrap_gen: {}", response.text.trim()))?;
    println!("Bootstrap generated with ID: {}", id);

    // Fetch the URI now so the id survives a daemon restart
    let uri_response = ctrl::send_command(&interface, &DaemonCommand::BootstrapGetUri { id })?;
    if is_fail(&uri_response.text) {
        log_warn(
            "commands",
            "bootstrap_uri_unavailable",
            &format!("id={} response={}", id, uri_response.text.trim()),
        );
        return Ok(());
    }
    let uri = uri_response.text.trim().to_string();
    remember(RecordKind::Bootstrap, id, &uri);
    println!("Bootstrap URI: {}", uri);
    Ok(())
}

fn cmd_qr_code(ctx: &Ctx, args: &str) -> Result<()> {
    if ctx.verbose {
        println!("Processing qr_code command: {}", args);
    }
    let interface = require_interface(args)?;
    let uri = args
        .split_whitespace()
        .find(|tok| tok.starts_with("DPP:"))
        .ok_or_else(|| anyhow!("QR code URI required (must start with 'DPP:')"))?
        .to_string();

    let response = ctrl::send_command(&interface, &DaemonCommand::QrCode { uri: uri.clone() })?;
    let id = parse_id(&response.text)
        .ok_or_else(|| anyhow!("daemon rejected QR code: {}", response.text.trim()))?;

    // Persist the original URI, not anything the daemon derived from it
    remember(RecordKind::Bootstrap, id, &uri);
    println!("Bootstrap info added with ID: {}", id);
    Ok(())
}

fn cmd_bootstrap_get_uri(ctx: &Ctx, args: &str) -> Result<()> {
    if ctx.verbose {
        println!("Processing bootstrap_get_uri command: {}", args);
    }
    let interface = require_interface(args)?;
    let id = require_id(args, "id")?;

    let response = ctrl::send_command(&interface, &DaemonCommand::BootstrapGetUri { id })?;
    if !is_fail(&response.text) {
        println!("Bootstrap URI: {}", response.text.trim());
        return Ok(());
    }

    // Daemon restarted or never knew the id; fall back to the local store
    match AssociationStore::open().lookup(RecordKind::Bootstrap, id) {
        Ok(uri) => {
            println!("Stored Peer QR Code (ID {}): {}", id, uri);
            Ok(())
        }
        Err(StoreError::NotFound { .. }) => bail!("Bootstrap ID {} not found", id),
        Err(e) => Err(e).context("reading association store"),
    }
}

fn cmd_auth_init(ctx: &Ctx, args: &str) -> Result<()> {
    if ctx.verbose {
        println!("Processing auth_init command: {}", args);
    }
    let interface = require_interface(args)?;
    let peer = require_id(args, "peer")?;
    let configurator = require_id(args, "configurator")?;
    let conf_type = util::arg(args, "conf");
    let ssid = util::arg(args, "ssid");
    let pass = util::arg(args, "pass");
    let matter_pin = util::arg(args, "matter_pin");
    let conf_json = util::arg(args, "conf_json");

    if conf_json.is_some()
        && (conf_type.is_some() || ssid.is_some() || pass.is_some() || matter_pin.is_some())
    {
        bail!("cannot mix conf_json with traditional parameters (conf, ssid, pass, matter_pin)");
    }
    if conf_json.is_none() && conf_type.is_none() {
        bail!("conf parameter required when not using conf_json");
    }
    if let Some(pin) = &matter_pin {
        if !util::is_valid_matter_pin(pin) {
            bail!("matter_pin must be exactly 8 digits (0-9 only)");
        }
    }

    // Step 1: create a configurator identity daemon-side. The daemon keeps
    // no state across restarts, so ids are re-derived on every auth_init.
    let response = ctrl::send_command(
        &interface,
        &DaemonCommand::ConfiguratorAdd {
            curve: Some(DEFAULT_CURVE.to_string()),
            key: None,
        },
    )?;
    let daemon_configurator = parse_id(&response.text)
        .ok_or_else(|| anyhow!("failed to add configurator to daemon: {}", response.text.trim()))?;

    // Step 2: replay the peer's stored URI so the daemon learns it again
    let uri = match AssociationStore::open().lookup(RecordKind::Bootstrap, peer) {
        Ok(uri) => uri,
        Err(StoreError::NotFound { .. }) => {
            bail!("cannot find bootstrap URI for peer ID {} (run qr_code or bootstrap_gen first)", peer)
        }
        Err(e) => return Err(e).context("reading association store"),
    };
    let response = ctrl::send_command(&interface, &DaemonCommand::QrCode { uri })?;
    let daemon_peer = parse_id(&response.text)
        .ok_or_else(|| anyhow!("daemon rejected stored peer URI: {}", response.text.trim()))?;

    // Step 3: start the authentication with the daemon-side ids
    let conf = match conf_json {
        Some(conf_json) => AuthConf::Json { conf_json },
        None => AuthConf::Params {
            conf: conf_type.unwrap_or_default(),
            ssid_hex: ssid.map(|s| hex_param(&s)),
            pass_hex: pass.map(|p| hex_param(&p)),
            matter_pin,
        },
    };
    let response = ctrl::send_command(
        &interface,
        &DaemonCommand::AuthInit {
            peer: daemon_peer,
            configurator: daemon_configurator,
            conf,
        },
    )?;

    let text = response.text.trim();
    if text.contains("OK") || text.contains("Authentication initiated") {
        println!(
            "DPP Authentication initiated for peer {} with configurator {}",
            peer, configurator
        );
        println!("Monitor progress with: dppctl auth_monitor interface={}", interface);
        Ok(())
    } else if text.contains("FAIL") {
        bail!("DPP authentication failed: {}", text);
    } else {
        bail!("unexpected daemon response: {}", text);
    }
}

/// Coarse classification of the daemon's STATUS dump during auth monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthProgress {
    Confirmed,
    InProgress,
    Unknown,
}

fn classify_auth_progress(status: &str) -> AuthProgress {
    if status.contains("dpp_auth_ok_on_ack") {
        AuthProgress::Confirmed
    } else if status.contains("dpp_auth_") {
        AuthProgress::InProgress
    } else {
        AuthProgress::Unknown
    }
}

fn config_completed(status: &str) -> bool {
    status.contains("DPP_CONF_SENT")
        || status.contains("dpp_conf_sent=1")
        || status.contains("conf_status=0")
}

fn cmd_auth_monitor(ctx: &Ctx, args: &str) -> Result<()> {
    if ctx.verbose {
        println!("Processing auth_monitor command: {}", args);
    }
    let interface = require_interface(args)?;
    let timeout_secs = util::arg(args, "timeout")
        .and_then(|s| s.parse().ok())
        .unwrap_or(MONITOR_DEFAULT_TIMEOUT_SECS);

    println!(
        "Monitoring DPP authentication progress (timeout: {}s)...",
        timeout_secs
    );

    let mut elapsed = 0;
    while elapsed < timeout_secs {
        std::thread::sleep(MONITOR_INTERVAL);
        elapsed += MONITOR_INTERVAL.as_secs();

        let status = ctrl::send_command(&interface, &DaemonCommand::Status)
            .context("failed to check authentication progress")?;

        match classify_auth_progress(&status.text) {
            AuthProgress::Confirmed => {
                println!("DPP Authentication completed successfully");
                // Raise daemon verbosity so configuration markers show up,
                // then probe for completion. Probe replies are best-effort.
                let _ = ctrl::send_command(
                    &interface,
                    &DaemonCommand::LogLevel {
                        level: "DEBUG".to_string(),
                    },
                );
                if let Ok(info) =
                    ctrl::send_command(&interface, &DaemonCommand::BootstrapInfo { id: 1 })
                {
                    if info.text.contains("OK") {
                        println!("Bootstrap info available: {}", info.text.trim());
                    }
                }
                let status = ctrl::send_command(&interface, &DaemonCommand::Status)
                    .context("failed to check configuration completion")?;
                if config_completed(&status.text) {
                    println!("DPP Configuration completed successfully");
                    return Ok(());
                }
                println!("Waiting for DPP Configuration completion...");
            }
            AuthProgress::InProgress => {
                println!("DPP Authentication in progress ({}s elapsed)", elapsed);
            }
            AuthProgress::Unknown => {
                println!("Checking authentication status... ({}s elapsed)", elapsed);
            }
        }
    }

    bail!("DPP authentication timeout after {} seconds", timeout_secs)
}

fn cmd_status(_ctx: &Ctx, args: &str) -> Result<()> {
    let store = AssociationStore::open();

    println!("DPP Configurator Status:");
    match store.summary() {
        Ok(summary) => {
            println!("  Configurators: {}", summary.configurator);
            println!("  Bootstrap entries: {}", summary.bootstrap);
        }
        Err(e) => println!("  State file unreadable: {}", e),
    }
    println!("  State file: {}", store.path().display());
    println!("  Log file: {}", crate::paths::log_path().display());

    if let Some(interface) = util::arg(args, "interface") {
        match ctrl::send_command(&interface, &DaemonCommand::Ping) {
            Ok(response) if response.text.trim() == "PONG" => {
                println!("  Daemon [{}]: reachable", interface);
            }
            Ok(response) => {
                println!(
                    "  Daemon [{}]: unexpected ping reply: {}",
                    interface,
                    response.text.trim()
                );
            }
            Err(e) => println!("  Daemon [{}]: unreachable ({})", interface, e),
        }
    }
    Ok(())
}

fn cmd_test_hostapd(_ctx: &Ctx, args: &str) -> Result<()> {
    let interface = require_interface(args)?;
    println!("Testing hostapd connection on interface: {}", interface);

    let ping = ctrl::send_command(&interface, &DaemonCommand::Ping).context("PING failed")?;
    println!("PING response: {}", ping.text.trim());

    let status = ctrl::send_command(&interface, &DaemonCommand::Status).context("STATUS failed")?;
    let head: String = status.text.chars().take(200).collect();
    let ellipsis = if status.text.chars().count() > 200 { "..." } else { "" };
    println!("STATUS response (first 200 chars): {}{}", head, ellipsis);

    let help = ctrl::send_command(&interface, &DaemonCommand::Help).context("HELP failed")?;
    if help.text.contains("DPP_") {
        println!("DPP commands found in HELP output:");
        for line in help.text.lines().filter(|line| line.contains("DPP_")) {
            println!("  {}", line);
        }
    } else {
        println!("No DPP commands found in HELP output");
        println!("hostapd may not be compiled with DPP support");
    }
    Ok(())
}

fn cmd_debug_dpp(_ctx: &Ctx, args: &str) -> Result<()> {
    let interface = require_interface(args)?;
    println!("DPP debug information for interface: {}", interface);

    let probes = [
        DaemonCommand::ConfiguratorAdd {
            curve: Some(DEFAULT_CURVE.to_string()),
            key: None,
        },
        DaemonCommand::QrCode {
            uri: SAMPLE_QR_URI.to_string(),
        },
        DaemonCommand::BootstrapGetUri { id: 1 },
        DaemonCommand::ConfiguratorGetKey { id: 1 },
        DaemonCommand::Listen { freq: 2412 },
        DaemonCommand::StopListen,
    ];

    // Probes continue past individual failures so one unsupported command
    // doesn't hide the rest of the picture
    for probe in &probes {
        match ctrl::send_command(&interface, probe) {
            Ok(response) => println!("{} -> {}", probe, response.text.trim()),
            Err(e) => println!("{} -> failed: {}", probe, e),
        }
    }
    Ok(())
}

fn cmd_help(_ctx: &Ctx, _args: &str) -> Result<()> {
    println!("Available commands:");
    for spec in COMMANDS {
        println!("  {:<20} {}", spec.name, spec.help);
    }
    println!();
    println!("Examples:");
    println!("  dppctl configurator_add interface=wlan0 curve=prime256v1");
    println!("  dppctl bootstrap_gen interface=wlan0 type=qr curve=prime256v1");
    println!("  dppctl bootstrap_get_uri interface=wlan0 id=1");
    println!("  dppctl qr_code interface=wlan0 DPP:C:81/6;M:54:32:04:1f:b5:a8;K:MDkw...;;");
    println!(
        "  dppctl auth_init interface=wlan0 peer=2 configurator=1 conf=sta-psk ssid=test pass=test123"
    );
    println!("  dppctl auth_monitor interface=wlan0 timeout=60");
    Ok(())
}

/// Pass through values that are already hex, encode everything else.
fn hex_param(value: &str) -> String {
    if util::is_hex_string(value) {
        value.to_string()
    } else {
        util::encode_hex(value)
    }
}
