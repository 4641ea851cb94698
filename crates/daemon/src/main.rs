// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tetherd: mirror daemon between local directories and game servers.
//!
//! Listens for a single WebSocket connection from the game client and,
//! each time one is accepted, rebuilds the configured mirror and
//! distribution bindings against the freshly connected instance.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tether_rpc::RpcClient;
use tether_sync::{Distributor, Mirror, ServerSelector, WatchOptions};

/// tetherd: bidirectional file mirror for game servers
#[derive(Parser, Debug)]
#[command(name = "tetherd")]
#[command(about = "Mirrors local directories to and from game servers over WebSocket")]
struct Args {
    /// Address to listen on for the game client
    #[arg(short, long, default_value = "127.0.0.1:12525")]
    bind: SocketAddr,

    /// Two-way mirror binding, as DIR=SELECTOR (selector: all, own,
    /// other, or a comma-separated server list); repeatable
    #[arg(short, long = "mirror", value_name = "DIR=SELECTOR")]
    mirror: Vec<String>,

    /// One-way distribution binding, as DIR=SELECTOR; repeatable
    #[arg(short, long = "distribute", value_name = "DIR=SELECTOR")]
    distribute: Vec<String>,

    /// Write the API type definition file here on every connection
    #[arg(long, value_name = "PATH")]
    types: Option<PathBuf>,

    /// Seed servers from local mirror contents on connect instead of
    /// pulling remote state down
    #[arg(long)]
    push_on_connect: bool,

    /// Poll the filesystem for changes instead of using native events
    #[arg(long)]
    poll: bool,

    /// Poll interval in milliseconds
    #[arg(long, default_value = "100")]
    poll_interval: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// One DIR=SELECTOR binding from the command line.
struct Binding {
    root: PathBuf,
    selector: ServerSelector,
}

impl FromStr for Binding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        let (dir, selector) = s
            .split_once('=')
            .ok_or_else(|| format!("expected DIR=SELECTOR, got '{}'", s))?;
        if dir.is_empty() {
            return Err(format!("empty directory in '{}'", s));
        }
        let selector = selector
            .parse::<ServerSelector>()
            .map_err(|e| e.to_string())?;
        Ok(Binding {
            root: PathBuf::from(dir),
            selector,
        })
    }
}

fn parse_bindings(specs: &[String]) -> Result<Vec<Binding>, String> {
    specs.iter().map(|s| s.parse()).collect()
}

/// What the main loop does with one connected-event receive outcome.
#[derive(Debug, PartialEq, Eq)]
enum ConnectionEvent {
    Rebuild,
    Skip,
    Shutdown,
}

fn classify_event(event: Result<(), RecvError>) -> ConnectionEvent {
    match event {
        Ok(()) => ConnectionEvent::Rebuild,
        // Lagging behind just means missed notifications; the next
        // connection still arrives on this receiver.
        Err(RecvError::Lagged(_)) => ConnectionEvent::Skip,
        Err(RecvError::Closed) => ConnectionEvent::Shutdown,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mirrors = parse_bindings(&args.mirror)?;
    let distributors = parse_bindings(&args.distribute)?;
    if mirrors.is_empty() && distributors.is_empty() && args.types.is_none() {
        warn!("no bindings configured; the daemon will only accept connections");
    }

    let options = WatchOptions {
        use_polling: args.poll,
        poll_interval: Duration::from_millis(args.poll_interval),
    };

    let client = RpcClient::new();
    let mut connections = client.subscribe_connected();

    info!("Starting tetherd");
    info!("  Bind address: {}", args.bind);

    {
        let client = client.clone();
        let bind = args.bind;
        tokio::spawn(async move {
            if let Err(e) = tether_rpc::listen(bind, client).await {
                tracing::error!("listener failed: {}", e);
            }
        });
    }

    // Bindings for the currently connected client. Replaced wholesale
    // on every accepted connection; dropping the old set stops its
    // watchers and poll loops.
    let mut active: Vec<Mirror> = Vec::new();
    let mut active_distributors: Vec<Distributor> = Vec::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            event = connections.recv() => {
                match classify_event(event) {
                    ConnectionEvent::Rebuild => {}
                    ConnectionEvent::Skip => continue,
                    ConnectionEvent::Shutdown => break,
                }
                active.clear();
                active_distributors.clear();

                if let Some(path) = &args.types {
                    if let Err(e) = write_definition_file(&client, path).await {
                        warn!("failed to write definition file: {}", e);
                    }
                }

                for binding in &mirrors {
                    match build_mirror(&client, binding, &options, args.push_on_connect).await {
                        Ok(mirror) => active.push(mirror),
                        Err(e) => warn!(
                            "failed to set up mirror for {}: {}",
                            binding.root.display(),
                            e
                        ),
                    }
                }
                for binding in &distributors {
                    match Distributor::create(
                        client.clone(),
                        &binding.root,
                        binding.selector.clone(),
                        options.clone(),
                    )
                    .await
                    {
                        Ok(distributor) => active_distributors.push(distributor),
                        Err(e) => warn!(
                            "failed to set up distributor for {}: {}",
                            binding.root.display(),
                            e
                        ),
                    }
                }
            }
        }
    }

    Ok(())
}

async fn write_definition_file(
    client: &RpcClient,
    path: &PathBuf,
) -> tether_core::Result<()> {
    let content = client.get_definition_file().await?;
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, content).await?;
    info!("wrote definition file to {}", path.display());
    Ok(())
}

async fn build_mirror(
    client: &RpcClient,
    binding: &Binding,
    options: &WatchOptions,
    push_on_connect: bool,
) -> tether_core::Result<Mirror> {
    tokio::fs::create_dir_all(&binding.root).await?;
    let mut mirror = Mirror::create(
        client.clone(),
        &binding.root,
        binding.selector.clone(),
        options.clone(),
    )
    .await?;
    mirror.init_cache().await?;
    if push_on_connect {
        mirror.push_all().await?;
    } else {
        mirror.reconcile().await?;
    }
    mirror.watch()?;
    Ok(mirror)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
