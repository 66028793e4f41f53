//! Berth CLI
//!
//! Command-line interface for the Docker Engine API.

mod commands;
mod config;

use std::time::Duration;

use anyhow::Result;
use berth_core::StaticConfiguration;
use berth_core::config::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "berth")]
#[command(about = "Docker Engine API client", long_about = None)]
struct Cli {
    /// Docker daemon host
    #[arg(long, env = "BERTH_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Docker daemon TCP port
    #[arg(long, env = "BERTH_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Connect using TLS
    #[arg(long, env = "BERTH_USE_SSL")]
    tls: bool,

    /// Accept invalid TLS certificates
    #[arg(long, env = "BERTH_IGNORE_SSL_ERRORS")]
    ignore_tls_errors: bool,

    /// Registry username
    #[arg(long, env = "BERTH_USERNAME", default_value = "")]
    username: String,

    /// Registry password
    #[arg(long, env = "BERTH_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Request timeout in seconds, 0 disables it
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// Log request details
    #[arg(short, long)]
    verbose: bool,

    /// Run the job in the background and print its notifications
    #[arg(long = "async")]
    async_mode: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose {
        "berth=info,berth_client=debug,berth_core=debug"
    } else {
        "berth=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config {
        docker: StaticConfiguration::new(cli.host, cli.port)
            .with_ssl(cli.tls)
            .with_ignore_ssl_errors(cli.ignore_tls_errors)
            .with_credentials(cli.username, cli.password),
        timeout: Duration::from_secs(cli.timeout),
        async_mode: cli.async_mode,
    };
    config.validate()?;

    handle_command(cli.command, &config).await
}
