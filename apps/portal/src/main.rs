mod api;
mod auth;
mod cli;
mod commands;
mod config;
mod error;
mod forms;
mod navigation;
mod session;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::PortalConfig;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("portal error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = PortalConfig::from_env()?;

    let level = if cli.verbose { "debug" } else { config.rust_log.as_str() };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), level))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    commands::run(cli, config).await
}
