//! Bus position relay
//!
//! Run with: cargo run --bin bus-relay -- [OPTIONS]
//!
//! Examples:
//!   bus-relay                                   # buses on :8080, browsers on :8000
//!   bus-relay --browse-path /ws -v              # browsers must connect to ws://host:8000/ws
//!   bus-relay --bus-port 9080 --expire-after 120

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use bus_relay::{RelayConfig, RelayServer, StoreConfig};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Relays live bus positions to viewport-filtered browsers")]
struct Args {
    /// Interface both endpoints bind to
    #[arg(long, env = "BUS_RELAY_HOST", default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port buses send positions to
    #[arg(long, env = "BUS_RELAY_BUS_PORT", default_value_t = 8080)]
    bus_port: u16,

    /// Port browsers subscribe on
    #[arg(long, env = "BUS_RELAY_BROWSER_PORT", default_value_t = 8000)]
    browser_port: u16,

    /// Only accept browsers on this request path, e.g. /ws
    #[arg(long, env = "BUS_RELAY_BROWSE_PATH")]
    browse_path: Option<String>,

    /// Seconds between two updates sent to a browser
    #[arg(long, default_value_t = 1.0)]
    publish_interval: f64,

    /// Forget buses silent for this many seconds (default: never)
    #[arg(long)]
    expire_after: Option<u64>,

    /// Maximum concurrent connections per endpoint (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_connections: usize,

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
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("bus_relay={level}"))),
        )
        .init();

    let mut store = StoreConfig::default();
    if let Some(secs) = args.expire_after {
        store = store.expire_after(Duration::from_secs(secs));
    }

    let mut config = RelayConfig::default()
        .ingest_addr(SocketAddr::new(args.host, args.bus_port))
        .browse_addr(SocketAddr::new(args.host, args.browser_port))
        .publish_interval(Duration::try_from_secs_f64(args.publish_interval)?)
        .max_connections(args.max_connections)
        .store(store);
    if let Some(path) = args.browse_path {
        config = config.browse_path(path);
    }

    let server = RelayServer::new(config);
    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
