// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Electrum discovery CLI
//!
//! # Usage
//!
//! ```bash
//! # Discover servers on the default network
//! electrum-discovery
//!
//! # Another network, JSON output
//! electrum-discovery --server irc.example.net --channel '#electrum-testnet' --json
//!
//! # Write a config file, then use it
//! electrum-discovery gen-config --output discovery.json
//! electrum-discovery --config discovery.json
//! ```

use clap::{Parser, Subcommand};
use electrum_discovery::{lookup, DiscoveryConfig, PeerRecord, ServiceKind};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Discover Electrum servers announced on IRC
#[derive(Parser, Debug)]
#[command(name = "electrum-discovery")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (JSON format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// IRC server hostname
    #[arg(short, long)]
    server: Option<String>,

    /// IRC server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Discovery channel
    #[arg(long)]
    channel: Option<String>,

    /// Member name prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Give up after this many seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Print records as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the default configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "discovery.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Some(Commands::GenConfig { output }) = &args.command {
        DiscoveryConfig::default().to_file(output)?;
        println!("Wrote {}", output.display());
        return Ok(());
    }

    let config = build_config(&args)?;
    config.validate()?;

    info!(
        "Looking up peers in {} on {}",
        config.channel,
        config.server_address()
    );
    let peers = lookup(&config).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&peers)?);
    } else {
        print_table(&peers);
    }

    Ok(())
}

fn build_config(args: &Args) -> Result<DiscoveryConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            DiscoveryConfig::from_file(path)?
        }
        None => DiscoveryConfig::default(),
    };

    if let Some(server) = &args.server {
        config.server_host = server.clone();
    }
    if let Some(port) = args.port {
        config.server_port = port;
    }
    if let Some(channel) = &args.channel {
        config.channel = channel.clone();
    }
    if let Some(prefix) = &args.prefix {
        config.member_prefix = prefix.clone();
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }

    Ok(config)
}

fn print_table(peers: &[PeerRecord]) {
    if peers.is_empty() {
        println!("No peers found");
        return;
    }

    println!(
        "{:<24} {:<40} {:<10} {:>7} {:>7} {:>8}",
        "NAME", "HOST", "VERSION", "TCP", "SSL", "PRUNING"
    );
    for peer in peers {
        let port = |kind| {
            peer.port(kind)
                .map(|p| p.to_string())
                .unwrap_or_else(|_| "-".into())
        };
        println!(
            "{:<24} {:<40} {:<10} {:>7} {:>7} {:>8}",
            peer.name(),
            peer.host(),
            peer.version(),
            port(ServiceKind::Plain),
            port(ServiceKind::Secure),
            peer.pruning_depth()
        );
    }
    println!("\n{} peers", peers.len());
}
