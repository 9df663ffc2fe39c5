use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use sitepreview::config::PreviewConfig;
use sitepreview::logging::{LogConfig, LogFormat, init_logging};

mod cmd;

#[derive(Parser)]
#[command(name = "sitepreview")]
#[command(version, about = "Per-website preview servers with idle expiry")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a config file. Defaults to ./sitepreview.toml when present.
    #[arg(long, global = true, env = "SITEPREVIEW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the preview management API
    Api {
        /// Port to serve on
        #[arg(short, long, default_value = "3141", env = "SITEPREVIEW_PORT")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Enable permissive CORS for a local front-end dev server
        #[arg(long)]
        dev: bool,

        #[command(flatten)]
        overrides: PreviewOverrides,
    },
    /// Serve one website directory (run by each preview process)
    Serve {
        #[arg(long)]
        port: u16,

        #[arg(long)]
        dir: PathBuf,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate configuration and list any problems
    Validate,
    /// Write a default sitepreview.toml
    Init,
}

/// CLI / environment overrides layered on top of the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct PreviewOverrides {
    /// Directory containing one sub-directory per business id
    #[arg(long, env = "SITEPREVIEW_WEBSITES_DIR")]
    pub websites_dir: Option<PathBuf>,

    /// First port handed to previews
    #[arg(long)]
    pub port_range_start: Option<u16>,

    /// Last port handed to previews (inclusive)
    #[arg(long)]
    pub port_range_end: Option<u16>,

    /// Idle minutes before a preview is reclaimed
    #[arg(long, env = "SITEPREVIEW_TIMEOUT_MINUTES")]
    pub timeout_minutes: Option<u64>,

    /// Seconds between expiry sweeps
    #[arg(long)]
    pub sweep_interval_secs: Option<u64>,
}

impl PreviewOverrides {
    pub fn apply(&self, config: &mut PreviewConfig) {
        if let Some(dir) = &self.websites_dir {
            config.websites_dir = dir.clone();
        }
        if let Some(start) = self.port_range_start {
            config.port_range_start = start;
        }
        if let Some(end) = self.port_range_end {
            config.port_range_end = end;
        }
        if let Some(minutes) = self.timeout_minutes {
            config.timeout_minutes = minutes;
        }
        if let Some(secs) = self.sweep_interval_secs {
            config.sweep_interval_secs = secs;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig::new(cli.log_format, cli.verbose));

    let project_dir = std::env::current_dir().context("Failed to get current directory")?;

    match &cli.command {
        Commands::Api {
            port,
            host,
            dev,
            overrides,
        } => {
            cmd::cmd_api(
                &project_dir,
                cli.config.as_deref(),
                host.clone(),
                *port,
                *dev,
                overrides,
            )
            .await?;
        }
        Commands::Serve { port, dir } => cmd::cmd_serve(*port, dir).await?,
        Commands::Config { command } => {
            cmd::cmd_config(&project_dir, cli.config.as_deref(), command.clone())?
        }
    }

    Ok(())
}
