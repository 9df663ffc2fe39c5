//! Configuration view and validation commands — `sitepreview config`.

use std::path::Path;

use anyhow::{Result, bail};
use sitepreview::config::{CONFIG_FILE_NAME, PreviewConfig};

use crate::ConfigCommands;

pub fn cmd_config(
    project_dir: &Path,
    explicit: Option<&Path>,
    command: Option<ConfigCommands>,
) -> Result<()> {
    let config_path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| project_dir.join(CONFIG_FILE_NAME));

    match command {
        None | Some(ConfigCommands::Show) => {
            let config = super::load_config(project_dir, explicit)?;
            if config_path.exists() {
                println!("# Config file: {}", config_path.display());
            } else {
                println!("# No {} found, using defaults", CONFIG_FILE_NAME);
            }
            print!("{}", config.to_toml()?);
        }
        Some(ConfigCommands::Validate) => {
            let config = super::load_config(project_dir, explicit)?;
            let problems = config.validate();
            if problems.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration problems:");
                for problem in &problems {
                    println!("  - {}", problem);
                }
                bail!("{} configuration problem(s) found", problems.len());
            }
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("{} already exists", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }
            std::fs::write(&config_path, PreviewConfig::default().to_toml()?)?;
            println!("Created {}", config_path.display());
        }
    }

    Ok(())
}
