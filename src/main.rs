use anyhow::Context;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod api;
mod config;
mod core;
mod data;
mod server;
mod service;
#[cfg(test)]
mod testing;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "soundhall", about = "Music streaming web service")]
pub struct CliArgs {
    /// Log level for the default filter
    #[arg(short, long, default_value = "info")]
    pub log_level: Level,

    /// Path to configuration file
    #[arg(short, long, default_value = "soundhall.toml")]
    pub config_file: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(args.log_level.into()))
        .init();

    tracing::debug!("Loading configuration from: {}", args.config_file);
    let config = Config::load(args.config_file).context("Failed to load configuration")?;

    tracing::debug!("Configuration loaded successfully: {:?}", config);

    tracing::info!("Server starting...");

    server::run(config)
        .await
        .context("Server failed to start")?;

    Ok(())
}
