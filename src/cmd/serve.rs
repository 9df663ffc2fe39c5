//! Static site server command — `sitepreview serve`.
//!
//! This is what each preview process runs.

use std::path::Path;

use anyhow::Result;

pub async fn cmd_serve(port: u16, dir: &Path) -> Result<()> {
    sitepreview::http::static_site::serve_directory(port, dir).await
}
