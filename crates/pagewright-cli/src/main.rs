// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pagewright_cli::commands;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pagewright")]
#[command(version)]
#[command(about = "Server-rendered pages with widget templates", long_about = None)]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Path to pagewright.toml (defaults to the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to run the server on (overrides [server].port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Host to bind to (overrides [server].host)
        #[arg(long)]
        host: Option<String>,
    },
    /// Print the registered pages
    Routes,
    /// Compile all templates and report failures
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with the specified log level
    let filter = EnvFilter::try_new(&cli.log_level)
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(config, host, port).await,
        Commands::Routes => commands::routes::run(config),
        Commands::Check => commands::check::run(config),
    }
}
