//! Configuration for the preview manager.
//!
//! Values are layered: built-in defaults, then the `[preview]` section of
//! `sitepreview.toml` (every key optional), then CLI flags / environment
//! variables applied by the command layer.
//!
//! ```toml
//! [preview]
//! websites_dir = "generated_websites"
//! port_range_start = 8001
//! port_range_end = 8999
//! timeout_minutes = 30
//! sweep_interval_secs = 60
//! startup_grace_ms = 500
//! stop_timeout_secs = 5
//! server_command = ["python3", "-m", "http.server", "{port}", "--directory", "{dir}"]
//! ```

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::preview::process::ServerCommand;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "sitepreview.toml";

/// Runtime configuration for previews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Directory holding one sub-directory per business id.
    pub websites_dir: PathBuf,
    pub port_range_start: u16,
    /// Inclusive upper bound.
    pub port_range_end: u16,
    pub timeout_minutes: u64,
    pub sweep_interval_secs: u64,
    pub startup_grace_ms: u64,
    pub stop_timeout_secs: u64,
    /// Argv for the static server; `{port}` and `{dir}` are substituted.
    /// `None` runs this binary's `serve` subcommand.
    pub server_command: Option<Vec<String>>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            websites_dir: PathBuf::from("generated_websites"),
            port_range_start: 8001,
            port_range_end: 8999,
            timeout_minutes: 30,
            sweep_interval_secs: 60,
            startup_grace_ms: 500,
            stop_timeout_secs: 5,
            server_command: None,
        }
    }
}

/// Raw TOML structure for `sitepreview.toml`.
#[derive(Debug, Default, Deserialize, Serialize)]
struct ConfigFile {
    #[serde(default)]
    preview: PreviewConfig,
}

impl PreviewConfig {
    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).context("Failed to parse preview config")?;
        Ok(file.preview)
    }

    /// Load configuration from an explicit file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load `sitepreview.toml` from `dir`, or defaults if it doesn't exist.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Serialize back to the on-disk format.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(&ConfigFile {
            preview: self.clone(),
        })
        .context("Failed to serialize preview config")
    }

    pub fn port_range(&self) -> RangeInclusive<u16> {
        self.port_range_start..=self.port_range_end
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// Resolve the command used to launch each preview server.
    pub fn server_command(&self) -> Result<ServerCommand> {
        match &self.server_command {
            Some(argv) => ServerCommand::from_argv(argv),
            None => ServerCommand::current_exe(),
        }
    }

    /// Validate the configuration and return any problems found.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.port_range_start == 0 {
            problems.push("port_range_start must be non-zero".to_string());
        }
        if self.port_range_start > self.port_range_end {
            problems.push(format!(
                "Empty port range: {} > {}",
                self.port_range_start, self.port_range_end
            ));
        }
        if self.timeout_minutes == 0 {
            problems.push("timeout_minutes must be at least 1".to_string());
        }
        if self.sweep_interval_secs == 0 {
            problems.push("sweep_interval_secs must be at least 1".to_string());
        }
        if let Some(argv) = &self.server_command {
            if argv.is_empty() {
                problems.push("server_command must not be empty".to_string());
            } else if !argv.iter().any(|a| a.contains("{port}")) {
                problems.push("server_command has no {port} placeholder".to_string());
            }
        }

        problems
    }
}
