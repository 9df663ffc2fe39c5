//! Management API server command — `sitepreview api`.

use std::path::Path;

use anyhow::{Result, bail};
use sitepreview::http::server::{ServerConfig, start_server};

use crate::PreviewOverrides;

pub async fn cmd_api(
    project_dir: &Path,
    explicit: Option<&Path>,
    host: String,
    port: u16,
    dev: bool,
    overrides: &PreviewOverrides,
) -> Result<()> {
    let mut preview = super::load_config(project_dir, explicit)?;
    overrides.apply(&mut preview);

    let problems = preview.validate();
    if !problems.is_empty() {
        for problem in &problems {
            tracing::error!(problem = %problem, "Invalid configuration");
        }
        bail!("Invalid configuration: {}", problems.join("; "));
    }

    start_server(ServerConfig {
        host,
        port,
        preview,
        dev_mode: dev,
    })
    .await
}
