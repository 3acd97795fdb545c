//! quick-cell-reload
//!
//! Rolls scheduler jobs by rewriting their reload meta tag. See the library
//! docs for the module layout.

use anyhow::Result;
use clap::Parser;
use quick_cell_reload::commands::{Cli, LogFormat};
use quick_cell_reload::config::Config;
use quick_cell_reload::{error, shutdown};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => cli.resolve_config(config),
        Err(e) => {
            error::print_error(&e);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log_level, cli.log_format());
    debug!(address = %config.address(), region = ?config.region, "Configuration loaded");

    let shutdown_rx = shutdown::install(cli.timeout());

    if let Err(e) = cli.run(config, shutdown_rx).await {
        error::print_error(&e);
        std::process::exit(1);
    }

    info!("Done");
    Ok(())
}

/// Initialize tracing (prefer RUST_LOG, fallback to the configured level).
fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}
