//! `hivectl` — command-line shell for the Hivemesh provider.
//!
//! Stands in for the desktop shell: everything it does goes through
//! `hivemesh-control`, the same library a graphical front end would embed.
//!
//! ```sh
//! # Provider health:
//! hivectl status
//!
//! # Reconciled hub table:
//! hivectl list
//!
//! # Connect a known hub at access level 2:
//! hivectl connect abc123 --level 2
//!
//! # Register-and-connect a brand-new hub:
//! hivectl add-hub 10.0.0.5:61000
//!
//! # Follow the provider view continuously:
//! hivectl watch --interval 1
//! ```
//!
//! # Environment variables
//!
//! See [`ControlConfig::from_env`] for socket paths and timeouts.

use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use hivemesh_control::{
    add_hub, ControlChannel, ControlConfig, ControlView, Engine, Health, Monitor, Node,
    ProviderStatus, Snapshot,
};
use hivemesh_provider_api::{AccessLevel, ConnectionMode};

/// hivectl — Hivemesh provider control CLI
///
/// Inspect the provider's hub view and drive connection changes.
#[derive(Parser)]
#[command(name = "hivectl", version, about, long_about = None)]
struct Cli {
    /// Transport to the provider.
    #[arg(long, value_enum, default_value = "unix")]
    transport: Transport,

    /// Provider binary for the degraded `cli` transport.
    #[arg(long, value_name = "PATH", env = "HIVEMESH_PROVIDER_BIN")]
    provider_bin: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Transport {
    /// HTTP/1.0 over the provider's Unix domain socket (normal operation).
    Unix,
    /// Spawn the provider binary per call and read stdout (degraded mode).
    Cli,
}

#[derive(Subcommand)]
enum Command {
    /// Print the provider's health.
    Status,

    /// Print the reconciled hub table (LAN-discovered first, then saved).
    List,

    /// Register a hub and connect it.
    Connect {
        /// Node id of a hub from `hivectl list`.
        node_id: String,

        /// Access level to grant (must be above 0).
        #[arg(long, default_value_t = 1)]
        level: u32,
    },

    /// Disconnect a hub and drop its registration.
    Disconnect {
        /// Node id of a hub from `hivectl list`.
        node_id: String,
    },

    /// Toggle provider-wide auto-connect mode.
    Auto {
        /// `on` or `off`.
        #[arg(value_parser = ["on", "off"])]
        state: String,

        /// Default access level for auto-connected hubs.
        #[arg(long)]
        level: Option<u32>,
    },

    /// Probe a new hub by address and register-and-connect it.
    ///
    /// The hub must answer `GET /node_id/` with `"<node_id> <host_name>"`;
    /// any other answer aborts before any provider mutation.
    AddHub {
        /// `host:port` of the hub.
        address: String,

        /// Access level to grant (must be above 0).
        #[arg(long, default_value_t = 1)]
        level: u32,
    },

    /// Print the provider's raw connection list.
    Connections,

    /// Poll continuously and print every published view.
    Watch {
        /// Seconds between polls.
        #[arg(long, default_value_t = 1)]
        interval: u64,
    },
}

fn build_channel(cli: &Cli, config: &ControlConfig) -> Arc<dyn ControlChannel> {
    match cli.transport {
        Transport::Unix => {
            let path = config.resolve_socket_path();
            tracing::info!("using provider socket at {}", path.display());
            Arc::new(hivemesh_control::UnixChannel::new(path, config.io_timeout()))
        }
        Transport::Cli => {
            let program = cli
                .provider_bin
                .clone()
                .unwrap_or_else(|| "hivemesh-provider".into());
            tracing::info!("using provider binary at {}", program.display());
            Arc::new(hivemesh_control::CliChannel::new(
                program,
                config.io_timeout(),
            ))
        }
    }
}

fn print_nodes(snapshot: &Snapshot) {
    match snapshot.auto_mode {
        ConnectionMode::Auto(level) => println!("auto-connect: on (level {level})"),
        ConnectionMode::Manual => println!("auto-connect: off"),
    }
    if snapshot.nodes.is_empty() {
        println!("no hubs");
        return;
    }
    println!("{:<24} {:<20} {:<22} {}", "NODE ID", "NAME", "ADDRESS", "ACCESS");
    for node in &snapshot.nodes {
        println!(
            "{:<24} {:<20} {:<22} {}",
            node.id, node.name, node.address, node.access
        );
    }
}

fn find_node<'a>(snapshot: &'a Snapshot, node_id: &str) -> Option<&'a Node> {
    snapshot.nodes.iter().find(|n| n.id == node_id)
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    process::exit(1)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hivemesh_control=warn,hivectl=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = ControlConfig::from_env();
    let engine = Engine::new(build_channel(&cli, &config));

    match cli.command {
        Command::Status => match engine.status().await {
            Ok(ProviderStatus::Ready) => println!("provider status: Ready"),
            Ok(ProviderStatus::Degraded(state)) => println!("provider status: {state}"),
            Err(_) => {
                println!("no connection");
                process::exit(1);
            }
        },

        Command::List => match engine.refresh().await {
            Ok(snapshot) => print_nodes(&snapshot),
            Err(e) => fail(e),
        },

        Command::Connect { node_id, level } => {
            if level == 0 {
                fail("connect requires an access level above 0 (use `disconnect`)");
            }
            let snapshot = engine.refresh().await.unwrap_or_else(|e| fail(e));
            let node = find_node(&snapshot, &node_id)
                .unwrap_or_else(|| fail(format!("unknown hub {node_id:?}")));
            match engine
                .set_node_access(&node.id, &node.name, &node.address, AccessLevel(level))
                .await
            {
                Ok(()) => println!("connected {} at level {level}", node.id),
                Err(e) => fail(e),
            }
        }

        Command::Disconnect { node_id } => {
            let snapshot = engine.refresh().await.unwrap_or_else(|e| fail(e));
            let node = find_node(&snapshot, &node_id)
                .unwrap_or_else(|| fail(format!("unknown hub {node_id:?}")));
            match engine
                .set_node_access(&node.id, &node.name, &node.address, AccessLevel::DISCONNECTED)
                .await
            {
                Ok(()) => println!("disconnected {}", node.id),
                Err(e) => fail(e),
            }
        }

        Command::Auto { state, level } => {
            let enabled = state == "on";
            match engine.set_auto_mode(enabled, level.map(AccessLevel)).await {
                Ok(()) => println!("auto-connect {state}"),
                Err(e) => fail(e),
            }
        }

        Command::AddHub { address, level } => {
            if level == 0 {
                fail("add-hub requires an access level above 0");
            }
            let client = reqwest::Client::new();
            match add_hub(&engine, &client, &address, AccessLevel(level)).await {
                Ok(identity) => println!(
                    "added hub {} ({}) at {address}",
                    identity.node_id, identity.host_name
                ),
                Err(e) => fail(e),
            }
        }

        Command::Connections => match engine.connections().await {
            Ok(entries) => {
                for entry in entries {
                    println!("{:<22} {}", entry.address, entry.status);
                }
            }
            Err(e) => fail(e),
        },

        Command::Watch { interval } => {
            let handle = Monitor::start(Arc::new(engine), Duration::from_secs(interval));
            let mut rx = handle.subscribe();
            loop {
                if rx.changed().await.is_err() {
                    break;
                }
                let view: ControlView = rx.borrow().clone();
                match view.health {
                    Health::Ready => println!("-- provider ready --"),
                    Health::Degraded(state) => println!("-- provider {state} --"),
                    Health::NoConnection => println!("-- no connection --"),
                }
                if let Some(snapshot) = view.snapshot {
                    print_nodes(&snapshot);
                }
            }
        }
    }
}
