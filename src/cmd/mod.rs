//! CLI command implementations.
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `api`    | `Api`            |
//! | `serve`  | `Serve`          |
//! | `config` | `Config`         |

pub mod api;
pub mod config;
pub mod serve;

pub use api::cmd_api;
pub use config::cmd_config;
pub use serve::cmd_serve;

use std::path::Path;

use anyhow::Result;
use sitepreview::config::PreviewConfig;

/// Load an explicit config file, or `sitepreview.toml` from `project_dir`.
pub fn load_config(project_dir: &Path, explicit: Option<&Path>) -> Result<PreviewConfig> {
    match explicit {
        Some(path) => PreviewConfig::load(path),
        None => PreviewConfig::load_or_default(project_dir),
    }
}
