//! CLI for msg-broker
//!
//! Starts the TCP listener and serves until Ctrl-C. Flags override the
//! configuration file and environment.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use msg_broker::broker::Broker;
use msg_broker::config::load_config;
use msg_broker::persistence::SnapshotStore;
use msg_broker::transport::start_tcp_server;
use msg_broker::utils::logging;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "msg-broker", about = "Run the pub/sub and queue message broker.")]
struct Cli {
    /// Host to bind the server to (default: localhost)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (default: 8888)
    #[arg(long)]
    port: Option<u16>,

    /// Directory holding topic and queue snapshots (default: .msg_data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    if let Err(e) = run(cli).await {
        error!("Broker failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config()?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(data_dir) = cli.data_dir {
        config.persistence.data_dir = data_dir.to_string_lossy().into_owned();
    }

    let store = SnapshotStore::open(&config.persistence.data_dir)?;
    let broker = Arc::new(Broker::new(store, config.broker.clone()));
    let restored = broker.restore()?;
    info!(
        restored,
        data_dir = %config.persistence.data_dir,
        "Queue status: {:?}",
        broker.status()
    );

    if config.broker.status_interval_secs > 0 {
        tokio::spawn(Broker::start_status_loop(
            broker.clone(),
            Duration::from_secs(config.broker.status_interval_secs),
        ));
    }

    tokio::select! {
        res = start_tcp_server(&config.server, broker) => {
            res?;
            error!("Server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}
