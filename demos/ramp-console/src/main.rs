//! Console front end for rampctl.
//!
//! Hosts a session (and drives the actuator) or joins one as a peer, with
//! stdin standing in for the keyboard.
//!
//! ```text
//! ramp-console [--config FILE] [--channel N] host [--players N] [--adapter ADDR]
//!              [--lockout-secs N] [--actuator PATH]
//! ramp-console [--config FILE] [--channel N] peer <HOST> [--address ADDR]
//! ```
//!
//! Commands, one per line:
//!
//! | command | effect |
//! |---|---|
//! | `press <key>` / `release <key>` | key event through the standard key map |
//! | `tap <key>` | press then release |
//! | `send <code>` | raw toggle request |
//! | `calibrate <preset>` | `full`, `drop`, `rotation`, `elevation-manual`, `elevation-automatic` |
//! | `status` | session status (and arbiter state on a host) |
//! | `peers` | connected peers (host only) |
//! | `quit` | stop and exit |
//!
//! Session events are printed to stdout as JSON lines. Logs go to stderr
//! and are filtered by `RUST_LOG` (default `info`).

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rampctl::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(
    name = "ramp-console",
    about = "Host or join a shared ramp-control session",
    version
)]
struct Cli {
    /// JSON config file. Flags override its values.
    #[arg(long, env = "RAMPCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Channel the host listens on (the TCP port).
    #[arg(long, env = "RAMPCTL_CHANNEL")]
    channel: Option<u16>,

    #[command(subcommand)]
    role: RoleArgs,
}

#[derive(Debug, Subcommand)]
enum RoleArgs {
    /// Accept peers and drive the actuator.
    Host {
        /// Total players including this operator (2-4).
        #[arg(long)]
        players: Option<u8>,

        /// Address to listen on.
        #[arg(long)]
        adapter: Option<String>,

        /// Seconds controls stay disabled after a drop.
        #[arg(long)]
        lockout_secs: Option<u64>,

        /// Write codes to this file (e.g. a serial device) instead of stdout.
        #[arg(long)]
        actuator: Option<PathBuf>,
    },

    /// Join a host by name.
    Peer {
        /// Name of a paired device.
        host: String,

        /// Address for `host`, when it is not in the config file.
        #[arg(long)]
        address: Option<String>,
    },
}

impl Cli {
    fn ramp_config(&self) -> anyhow::Result<RampConfig> {
        let mut config = match &self.config {
            Some(path) => RampConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => RampConfig::default(),
        };
        if let Some(channel) = self.channel {
            config.channel = channel;
        }

        match &self.role {
            RoleArgs::Host {
                players,
                adapter,
                lockout_secs,
                ..
            } => {
                if let Some(players) = players {
                    config.players = *players;
                }
                if let Some(address) = adapter {
                    config.local_adapter = Some(DeviceInfo::new("local", address.clone()));
                }
                if let Some(secs) = lockout_secs {
                    config.lockout_secs = *secs;
                }
            }
            RoleArgs::Peer { host, address } => {
                if let Some(address) = address {
                    config.devices.retain(|d| d.name != *host);
                    config.devices.push(DeviceInfo::new(host.clone(), address.clone()));
                }
            }
        }
        Ok(config.validated())
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.ramp_config()?;

    let (mut role, events) = match &cli.role {
        RoleArgs::Host { actuator, .. } => {
            let arbiter = match actuator {
                Some(path) => {
                    let device = tokio::fs::OpenOptions::new()
                        .write(true)
                        .open(path)
                        .await
                        .with_context(|| format!("opening actuator {}", path.display()))?;
                    spawn_arbiter(config.arbiter_config(), LineActuator::new(device))
                }
                None => spawn_arbiter(
                    config.arbiter_config(),
                    LineActuator::new(tokio::io::stdout()),
                ),
            };
            TcpRole::host(&config, arbiter)
        }
        RoleArgs::Peer { host, .. } => {
            let (mut role, events) = TcpRole::peer(&config, TcpConnector);
            if let Role::Peer(client) = &mut role {
                client
                    .resolve(host)
                    .await
                    .with_context(|| format!("resolving host {host:?}"))?;
            }
            (role, events)
        }
    };

    tokio::spawn(print_events(events));
    role.start().await.context("starting session")?;

    tokio::select! {
        res = run_console(&role) => res?,
        res = tokio::signal::ctrl_c() => {
            res.context("waiting for Ctrl+C")?;
            tracing::info!("received Ctrl+C, shutting down");
        }
    }

    role.stop().await;
    Ok(())
}

async fn print_events(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "could not encode event"),
        }
    }
}

// ---------------------------------------------------------------------------
// Command loop
// ---------------------------------------------------------------------------

/// Reads commands from stdin until `quit` or end of input.
async fn run_console(role: &TcpRole) -> anyhow::Result<()> {
    let mut keys = KeyMap::standard();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let arg = words.next();

        let requests = match (command, arg) {
            ("quit" | "exit", _) => break,
            ("press", Some(key)) => key_requests(&mut keys, key, &[KeyEdge::Press]),
            ("release", Some(key)) => key_requests(&mut keys, key, &[KeyEdge::Release]),
            ("tap", Some(key)) => {
                key_requests(&mut keys, key, &[KeyEdge::Press, KeyEdge::Release])
            }
            ("send", Some(code)) => match ActionCode::new(code) {
                Ok(code) => vec![ActionRequest::toggle(PeerId::Local, code)],
                Err(e) => {
                    eprintln!("invalid code: {e}");
                    continue;
                }
            },
            ("calibrate", Some(name)) => match name.parse::<CalibrationPreset>() {
                Ok(preset) => vec![preset.request(PeerId::Local)],
                Err(e) => {
                    eprintln!("{e}");
                    continue;
                }
            },
            ("status", _) => {
                print_status(role);
                continue;
            }
            ("peers", _) => {
                match role {
                    Role::Host(listener) => eprintln!("{:?}", listener.peers().await),
                    Role::Peer(_) => eprintln!("peers are only known to the host"),
                }
                continue;
            }
            _ => {
                eprintln!("unknown command: {line}");
                continue;
            }
        };

        for request in requests {
            match role.submit(request).await {
                Ok(Some(Verdict::Rejected(reason))) => eprintln!("rejected: {reason}"),
                Ok(_) => {}
                Err(e) => eprintln!("error: {e}"),
            }
        }
    }
    Ok(())
}

fn key_requests(keys: &mut KeyMap, key: &str, edges: &[KeyEdge]) -> Vec<ActionRequest> {
    let Some(key) = key.chars().next() else {
        return Vec::new();
    };
    edges
        .iter()
        .filter_map(|&edge| {
            let input = KeyInput {
                key,
                edge,
                auto_repeat: false,
            };
            keys.translate(PeerId::Local, input)
        })
        .collect()
}

fn print_status(role: &TcpRole) {
    eprintln!("session: {}", role.status());
    if let Some(arbiter) = role.arbiter() {
        match serde_json::to_string(&arbiter.snapshot()) {
            Ok(line) => eprintln!("arbiter: {line}"),
            Err(e) => eprintln!("arbiter: {e}"),
        }
    }
}
