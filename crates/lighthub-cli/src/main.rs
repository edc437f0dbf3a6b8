//! LightHub CLI - discover LED strip nodes and drive effects on them
//!
//! `lighthub run` keeps discovering nodes and animates every node it finds
//! with the chase effect until Ctrl+C. `lighthub probe` lists the nodes that
//! answer within a time window.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use lighthub_discovery::{DiscoveryEvent, DiscoveryService, NodeRegistry};
use lighthub_effects::{ChaseEffect, EffectEngine};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use config::HubConfig;

/// LightHub - LED strip node hub
#[derive(Parser)]
#[command(name = "lighthub")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "LIGHTHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that override the config file
#[derive(clap::Args, Debug, Default)]
struct DiscoveryArgs {
    /// Port nodes listen on for PING and PIXELS
    #[arg(long)]
    send_port: Option<u16>,

    /// Port to receive INFO replies on
    #[arg(long)]
    recv_port: Option<u16>,

    /// Probe period in milliseconds
    #[arg(long)]
    period_ms: Option<u64>,

    /// Probe destination address
    #[arg(long)]
    broadcast: Option<std::net::IpAddr>,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover nodes and run the chase effect on them
    Run {
        #[command(flatten)]
        discovery: DiscoveryArgs,

        /// Effect tick period in milliseconds
        #[arg(long)]
        tick_ms: Option<u64>,
    },

    /// List nodes that answer within a time window
    Probe {
        #[command(flatten)]
        discovery: DiscoveryArgs,

        /// How long to wait for replies, in milliseconds
        #[arg(short, long, default_value = "3000")]
        wait_ms: u64,
    },

    /// Show version and defaults
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli.log_level, cli.json_logs)?;

    let mut config = match &cli.config {
        Some(path) => HubConfig::load(path)?,
        None => HubConfig::default(),
    };

    // Handle Ctrl+C
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            return;
        }
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(()).await;
    });

    match cli.command {
        Commands::Run { discovery, tick_ms } => {
            apply_overrides(&mut config, &discovery);
            if let Some(tick_ms) = tick_ms {
                config.tick_ms = tick_ms;
            }
            config.validate()?;
            run_hub(config, &mut shutdown_rx).await?;
        }

        Commands::Probe { discovery, wait_ms } => {
            apply_overrides(&mut config, &discovery);
            config.validate()?;
            probe(config, Duration::from_millis(wait_ms), &mut shutdown_rx).await?;
        }

        Commands::Info => {
            print_info(&config);
        }
    }

    Ok(())
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact())
            .init();
    }

    Ok(())
}

fn apply_overrides(config: &mut HubConfig, args: &DiscoveryArgs) {
    let section = &mut config.discovery;
    if let Some(port) = args.send_port {
        section.send_port = port;
    }
    if let Some(port) = args.recv_port {
        section.recv_port = port;
    }
    if let Some(period) = args.period_ms {
        section.period_ms = period;
    }
    if let Some(addr) = args.broadcast {
        section.broadcast = addr;
    }
}

async fn run_hub(config: HubConfig, shutdown_rx: &mut mpsc::Receiver<()>) -> Result<()> {
    let registry = Arc::new(NodeRegistry::new());
    let discovery = config.discovery_config();
    let period = discovery.period;

    let (service, mut events) = DiscoveryService::start(discovery, registry.clone())
        .await
        .context("Failed to start discovery")?;

    println!(
        "{} Probing port {} from {}, listening on {}",
        "LIGHTHUB".cyan().bold(),
        config.discovery.send_port,
        service.local_send_addr(),
        service.local_recv_addr()
    );

    let mut engine = EffectEngine::new();
    let (color1, color2) = config.chase.colors();
    engine.add_effect(ChaseEffect::new(color1, color2, config.chase.speed()));

    let tick = config.tick();
    let mut ticker = interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut status = interval_at(Instant::now() + period, period);
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,

            event = events.recv() => match event {
                Some(DiscoveryEvent::NodeDiscovered(node)) => {
                    println!("{} {}", "NODE".green().bold(), node.snapshot());
                    engine.attach_node(node);
                }
                Some(DiscoveryEvent::NodeLost(node)) => {
                    println!("{} {}", "LOST".red().bold(), node.name());
                }
                None => {
                    warn!("Discovery stopped unexpectedly");
                    break;
                }
            },

            now = ticker.tick() => {
                engine.tick(now - last_tick);
                last_tick = now;
            }

            _ = status.tick() => {
                info!(
                    "{} nodes, {} connected",
                    registry.len(),
                    registry.connected_count()
                );
            }
        }
    }

    service
        .shutdown()
        .await
        .context("Discovery did not shut down cleanly")?;
    println!("{}", "Hub stopped".yellow());

    Ok(())
}

async fn probe(
    config: HubConfig,
    wait: Duration,
    shutdown_rx: &mut mpsc::Receiver<()>,
) -> Result<()> {
    let registry = Arc::new(NodeRegistry::new());
    let (service, mut events) = DiscoveryService::start(config.discovery_config(), registry.clone())
        .await
        .context("Failed to start discovery")?;

    println!(
        "{} Waiting {} ms for nodes on port {}",
        "LIGHTHUB".cyan().bold(),
        wait.as_millis(),
        config.discovery.send_port
    );

    let deadline = tokio::time::sleep(wait);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = shutdown_rx.recv() => break,
            event = events.recv() => match event {
                Some(DiscoveryEvent::NodeDiscovered(node)) => {
                    println!("  {} {}", "+".green(), node.name());
                }
                Some(DiscoveryEvent::NodeLost(_)) => {}
                None => break,
            },
        }
    }

    service
        .shutdown()
        .await
        .context("Discovery did not shut down cleanly")?;

    let nodes = registry.all();
    if nodes.is_empty() {
        println!("{}", "No nodes found".yellow());
    } else {
        println!("{} {} node(s):", "OK".green().bold(), nodes.len());
        for node in nodes {
            println!("  {}", node.snapshot());
        }
    }

    Ok(())
}

fn print_info(config: &HubConfig) {
    println!("{}", "LightHub - LED strip node hub".cyan().bold());
    println!();
    println!("Version:    {}", env!("CARGO_PKG_VERSION"));
    println!("Platform:   {}", std::env::consts::OS);
    println!("Arch:       {}", std::env::consts::ARCH);
    println!();
    println!("{}", "Discovery:".green());
    println!("  Send port:    {}", config.discovery.send_port);
    println!("  Receive port: {}", config.discovery.recv_port);
    println!("  Broadcast:    {}", config.discovery.broadcast);
    println!("  Period:       {} ms", config.discovery.period_ms);
    println!();
    println!("{}", "Examples:".green());
    println!("  lighthub probe --wait-ms 5000          # List nodes on the LAN");
    println!("  lighthub run --config hub.toml         # Discover and animate");
    println!("  lighthub run --recv-port 6000 -l debug # Override the reply port");
}
