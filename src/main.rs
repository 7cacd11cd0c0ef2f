//! dppctl: DPP configurator CLI for hostapd control sockets
//!
//! Usage:
//!   dppctl [-v] <command> [key=value ...]
//!
//! Bridges one-shot CLI invocations to a DPP-capable hostapd daemon over
//! its UNIX datagram control socket, and keeps created bootstrap and
//! configurator ids in a small state file so they survive daemon restarts.

mod commands;
mod config;
mod ctrl;
mod log;
mod paths;
mod store;
mod util;

use anyhow::Result;
use std::env;
use std::panic;

/// One parsed CLI invocation
#[derive(Debug, PartialEq)]
struct Invocation {
    verbose: bool,
    command: String,
    args: String,
}

/// Split argv into flag, command name and a single space-joined argument
/// string (the key=value handlers tokenize it themselves).
fn parse_invocation(argv: &[String]) -> Option<Invocation> {
    let mut idx = 1;
    let mut verbose = false;
    if argv.get(idx).map(String::as_str) == Some("-v") {
        verbose = true;
        idx += 1;
    }
    let command = argv.get(idx)?.clone();
    let args = argv[idx + 1..].join(" ");
    Some(Invocation {
        verbose,
        command,
        args,
    })
}

fn print_usage(prog: &str) {
    eprintln!("Usage: {} [-v] <command> [args...]", prog);
    eprintln!("Commands:");
    for spec in commands::COMMANDS {
        eprintln!("  {:<20} {}", spec.name, spec.help);
    }
    eprintln!("Options:");
    eprintln!("  -v    Verbose mode");
}

fn main() {
    // Initialize global config from environment variables
    config::Config::init();

    // Panics land in the log file as well as on stderr
    panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        log::log_error("main", "panic", &format!("{} at {}", message, location));
        eprintln!("dppctl panicked: {} at {}", message, location);
    }));

    let argv: Vec<String> = env::args().collect();
    let prog = argv.first().map(String::as_str).unwrap_or("dppctl");

    let Some(invocation) = parse_invocation(&argv) else {
        print_usage(prog);
        std::process::exit(1);
    };

    if let Err(e) = run(&invocation) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(invocation: &Invocation) -> Result<()> {
    let ctx = commands::Ctx {
        verbose: invocation.verbose || config::Config::get().verbose,
    };
    commands::execute(&ctx, &invocation.command, &invocation.args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_command_yields_none() {
        assert_eq!(parse_invocation(&argv(&["dppctl"])), None);
        assert_eq!(parse_invocation(&argv(&["dppctl", "-v"])), None);
    }

    #[test]
    fn command_without_flag() {
        let inv = parse_invocation(&argv(&["dppctl", "status"])).unwrap();
        assert_eq!(
            inv,
            Invocation {
                verbose: false,
                command: "status".into(),
                args: String::new(),
            }
        );
    }

    #[test]
    fn verbose_flag_is_consumed_before_command() {
        let inv = parse_invocation(&argv(&["dppctl", "-v", "status", "interface=wlan0"])).unwrap();
        assert_eq!(
            inv,
            Invocation {
                verbose: true,
                command: "status".into(),
                args: "interface=wlan0".into(),
            }
        );
    }

    #[test]
    fn trailing_args_are_space_joined() {
        let inv = parse_invocation(&argv(&[
            "dppctl",
            "auth_init",
            "interface=wlan0",
            "peer=2",
            "configurator=1",
        ]))
        .unwrap();
        assert_eq!(inv.command, "auth_init");
        assert_eq!(inv.args, "interface=wlan0 peer=2 configurator=1");
    }
}
