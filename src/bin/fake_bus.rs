//! Simulated bus fleet
//!
//! Run with: cargo run --bin fake-bus -- [OPTIONS]
//!
//! Examples:
//!   fake-bus --routes-dir routes                         # one bus per route, 5 connections
//!   fake-bus --buses-per-route 20 --websockets-number 10 # 20 buses spread along each route
//!   fake-bus --emulator-id a- --no-loop                  # prefixed ids, stop at the last stop

use std::path::PathBuf;
use std::time::Duration;

use bus_relay::client::load_routes;
use bus_relay::{ChannelMultiplexer, EmulatorConfig};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Feeds simulated buses into a bus relay")]
struct Args {
    /// Relay ingest endpoint
    #[arg(long, env = "FAKE_BUS_SERVER", default_value = "ws://127.0.0.1:8080")]
    server: String,

    /// Directory of route JSON files
    #[arg(long, env = "FAKE_BUS_ROUTES_DIR", default_value = "routes")]
    routes_dir: PathBuf,

    /// Limit the number of routes simulated
    #[arg(long)]
    routes_number: Option<usize>,

    /// Buses on every route
    #[arg(long, default_value_t = 1)]
    buses_per_route: usize,

    /// Number of connections to the relay
    #[arg(long, default_value_t = 5)]
    websockets_number: usize,

    /// Queue capacity of each connection
    #[arg(long, default_value_t = 100)]
    channel_capacity: usize,

    /// Prefix for bus ids, to run several generators against one relay
    #[arg(long, default_value = "")]
    emulator_id: String,

    /// Seconds between two positions of one bus
    #[arg(long, default_value_t = 1.0)]
    refresh_timeout: f64,

    /// Take every N-th route point
    #[arg(long, default_value_t = 1)]
    step: usize,

    /// Stop each bus at the end of its route
    #[arg(long)]
    no_loop: bool,

    /// Seconds to wait before reopening a failed connection
    #[arg(long, default_value_t = 1.0)]
    reconnect_delay: f64,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("bus_relay={level},fake_bus={level}"))),
        )
        .init();

    let mut config = EmulatorConfig::new(args.server)
        .websockets_number(args.websockets_number)
        .channel_capacity(args.channel_capacity)
        .buses_per_route(args.buses_per_route)
        .emulator_id(args.emulator_id)
        .refresh_timeout(Duration::try_from_secs_f64(args.refresh_timeout)?)
        .step(args.step)
        .reconnect_delay(Duration::try_from_secs_f64(args.reconnect_delay)?);
    if let Some(count) = args.routes_number {
        config = config.routes_number(count);
    }
    if args.no_loop {
        config = config.no_loop();
    }

    let routes = load_routes(&args.routes_dir)?;
    if routes.is_empty() {
        return Err(format!("no routes found in {}", args.routes_dir.display()).into());
    }

    let fleet = ChannelMultiplexer::start(&config, routes)?;

    if config.looped {
        let _ = tokio::signal::ctrl_c().await;
        fleet.shutdown().await;
    } else {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
            }
            _ = fleet.join() => {
                tracing::info!("All routes finished");
            }
        }
    }

    Ok(())
}
