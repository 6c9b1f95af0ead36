//! CLI module for Easel
//!
//! Provides commands:
//! - `serve`: Start the canvas server
//! - `saved`: List saved images
//! - `config`: Print the effective configuration

use anyhow::Context;
use clap::{Parser, Subcommand};
use easel_store::SqliteImageStore;

use crate::server::config::AppConfig;

/// Easel canvas CLI
#[derive(Parser, Debug)]
#[command(name = "easel")]
#[command(about = "Interactive canvas for AI image generation")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server
    Serve,
    /// List saved images, newest first
    Saved {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration (API keys omitted)
    Config,
}

/// Run the CLI command
pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Serve) => crate::server::run(config).await,
        Some(Commands::Saved { json }) => list_saved(&config, json).await,
        Some(Commands::Config) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&config).context("Failed to serialize config")?
            );
            Ok(())
        }
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

async fn list_saved(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let store = SqliteImageStore::connect(&config.storage)
        .await
        .context("Failed to open image store")?;
    let saved = store
        .list_saved()
        .await
        .context("Failed to list saved images")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&saved)?);
        return Ok(());
    }

    if saved.is_empty() {
        println!("No saved images.");
        return Ok(());
    }
    for image in &saved {
        println!("{}\t{}\t{}", image.id, image.url, image.prompt);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_saved_json_flag() {
        let cli = Cli::try_parse_from(["easel", "saved", "--json"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Saved { json: true })));
    }

    #[test]
    fn test_no_subcommand() {
        let cli = Cli::try_parse_from(["easel"]).unwrap();
        assert!(cli.command.is_none());
    }
}
