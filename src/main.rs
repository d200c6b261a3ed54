//! Users service built on the express-plus router.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use express_plus::config::{load_config, ServerConfig};
use express_plus::observability::{logging, metrics};
use express_plus::users::{self, MemoryUserRepository};
use express_plus::App;

#[derive(Parser)]
#[command(name = "express-plus")]
#[command(about = "Users REST service", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides listener.bind_address)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    logging::init(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        max_body_bytes = config.limits.max_body_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let port = cli
        .port
        .or_else(|| config.listener.port())
        .ok_or("listener.bind_address has no port")?;

    let mut app = App::with_config(config);
    users::register(&mut app, Arc::new(MemoryUserRepository::new()));

    app.listen(port, |addr| {
        tracing::info!(address = %addr, "Server is running");
    })
    .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
