//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod courts;
mod crawl;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use caselook::config::Config;

#[derive(Parser)]
#[command(name = "caselook")]
#[command(about = "Court-by-court export crawler for the Caselook case-law portal")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl every included court back to the cutoff and record export links
    Crawl {
        /// Only crawl these court ids (can specify multiple)
        #[arg(long = "court", value_name = "ID")]
        courts: Vec<String>,
        /// Write the item manifest without fetching export files
        #[arg(long)]
        no_download: bool,
        /// Portal login email
        #[arg(long, env = "CASELOOK_EMAIL")]
        email: Option<String>,
        /// Portal login password
        #[arg(long, env = "CASELOOK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// List the court catalogue and which courts will be crawled
    Courts {
        /// Only show courts marked for inclusion
        #[arg(long)]
        included: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Load the config file given with `--config`, or discover one.
async fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::load_from_path(&path).await?
        }
        None => Config::load().await,
    };
    config.crawl.validate()?;
    Ok(config)
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config).await?;

    match cli.command {
        Commands::Crawl {
            courts,
            no_download,
            email,
            password,
        } => crawl::cmd_crawl(&config, courts, no_download, email, password).await,
        Commands::Courts { included } => courts::cmd_courts(&config, included),
        Commands::Config => config_cmd::cmd_config_show(&config),
    }
}
