//! CLI for rptfetch.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rptfetch_core::config::{self, FetchConfig};
use std::path::PathBuf;

use commands::{run_config, run_download_once, run_links, run_marker};

/// Top-level CLI for rptfetch.
#[derive(Debug, Parser)]
#[command(name = "rptfetch")]
#[command(about = "rptfetch: download newly published daily report archives", long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of ~/.config/rptfetch/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Per-run overrides of the configuration file.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Directory to download archives into.
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,
    /// Listing page URL.
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,
    /// Number of concurrent downloads.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,
}

impl Overrides {
    pub fn apply(&self, cfg: &mut FetchConfig) {
        if let Some(dir) = &self.dir {
            cfg.download_dir = dir.clone();
        }
        if let Some(url) = &self.url {
            cfg.listing_url = url.clone();
        }
        if let Some(workers) = self.workers {
            cfg.workers = workers;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch the listing page and download every new archive (one full run).
    #[command(alias = "download")]
    Run {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// List the archive links on the listing page and which ones a run would download.
    Links {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Show the retention marker (newest date handled by previous runs).
    Marker {
        /// Remove the marker so the next run considers every listed date again.
        #[arg(long)]
        clear: bool,
        /// Directory holding the marker.
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Print the config file location and the effective configuration.
    Config,
}

impl Cli {
    fn load_config(&self) -> Result<FetchConfig> {
        match &self.config {
            Some(path) => config::load_from_path(path),
            None => config::load_or_init(),
        }
    }

    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = cli.load_config()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run { overrides } => {
                overrides.apply(&mut cfg);
                run_download_once(cfg).await?;
            }
            CliCommand::Links { overrides } => {
                overrides.apply(&mut cfg);
                run_links(cfg).await?;
            }
            CliCommand::Marker { clear, dir } => {
                if let Some(dir) = dir {
                    cfg.download_dir = dir;
                }
                run_marker(&cfg, clear)?;
            }
            CliCommand::Config => run_config(&cfg, cli.config.as_deref())?,
        }

        Ok(())
    }
}
