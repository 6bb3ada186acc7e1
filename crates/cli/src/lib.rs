pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "movely", about = "Operations CLI for the movely lead service")]
pub struct Cli {
    /// Path to the TOML config file (defaults to movely.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the database URL.
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply pending database migrations.
    Migrate,
    /// Print the resolved configuration (secrets redacted).
    Config,
    /// Check database connectivity and queue health.
    Doctor,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let options = movely_core::LoadOptions {
        config_path: cli.config,
        overrides: movely_core::ConfigOverrides {
            database_url: cli.database_url,
            // The CLI never serves media; a placeholder keeps validation
            // focused on what the command actually touches.
            media_signing_secret: Some("cli-unused".to_string()),
            ..movely_core::ConfigOverrides::default()
        },
        ..movely_core::LoadOptions::default()
    };

    match cli.command {
        Command::Migrate => commands::migrate::run(options).await,
        Command::Config => commands::config::run(options),
        Command::Doctor => commands::doctor::run(options).await,
    }
}
