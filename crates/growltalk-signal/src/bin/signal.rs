//! GrowlTalk Signal Server
//!
//! HTTP signaling relay for kiosk/operator video calls.
//!
//! # Usage
//!
//! ```bash
//! # Defaults (port 9999, 10 s session TTL)
//! growltalk-signal
//!
//! # Custom port and TTL
//! growltalk-signal --port 8443 --ttl-ms 20000
//!
//! # Same, from the environment or a .env file
//! SERVER_PORT=8443 DELETE_TIMER=20000 growltalk-signal
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use growltalk_core::Config;
use growltalk_signal::{Registry, SignalServer};

#[derive(Parser, Debug)]
#[command(name = "growltalk-signal")]
#[command(about = "GrowlTalk signaling relay for kiosks and operators")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides SERVER_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// Session TTL in milliseconds (overrides DELETE_TIMER)
    #[arg(long)]
    ttl_ms: Option<u64>,

    /// TOML configuration file (defaults to the per-user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();

    if args.print_config {
        print!("{}", Config::sample());
        return Ok(());
    }

    if let Ok(path) = dotenv::dotenv() {
        info!("Loaded environment from {:?}", path);
    }

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    config.apply_env();

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(ttl_ms) = args.ttl_ms {
        config.session.ttl_ms = ttl_ms;
    }

    let addr = config.server.socket_addr();

    info!("Starting GrowlTalk Signal Server");
    info!(
        "Session TTL {} ms, sweeping every {:?}",
        config.session.ttl_ms(),
        config.session.half_life()
    );

    let registry = Arc::new(Registry::new(config.session.ttl()));
    let server = SignalServer::new(registry, &config.proxy);
    server.serve(addr).await?;

    Ok(())
}
