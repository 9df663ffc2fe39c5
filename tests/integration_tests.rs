//! Integration tests for sitepreview
//!
//! These drive the real binary: the CLI surface, and the `serve` subcommand as
//! the static server behind real previews.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use sitepreview::preview::{PortAllocator, PreviewApi, PreviewRegistry, RegistrySettings, ServerCommand};

/// Helper to create a sitepreview Command
fn sitepreview() -> Command {
    cargo_bin_cmd!("sitepreview")
}

/// Helper to create a websites directory holding the given sites
fn websites(ids: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for id in ids {
        let site = dir.path().join(id);
        fs::create_dir_all(&site).unwrap();
        fs::write(site.join("index.html"), format!("<h1>{}</h1>", id)).unwrap();
    }
    dir
}

fn registry_for(dir: &TempDir, ports: std::ops::RangeInclusive<u16>) -> Arc<PreviewRegistry> {
    Arc::new(PreviewRegistry::new(RegistrySettings {
        websites_dir: dir.path().to_path_buf(),
        port_range: ports,
        timeout_minutes: 30,
        startup_grace: Duration::from_millis(500),
        stop_timeout: Duration::from_secs(5),
        command: ServerCommand::serve_with(env!("CARGO_BIN_EXE_sitepreview")),
    }))
}

/// GET `url`, retrying briefly while the child finishes binding.
async fn fetch(url: &str) -> Option<String> {
    for _ in 0..20 {
        if let Ok(resp) = reqwest::get(url).await {
            return resp.text().await.ok();
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    None
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        sitepreview()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"));
    }

    #[test]
    fn test_version() {
        sitepreview().arg("--version").assert().success();
    }

    #[test]
    fn test_config_show_defaults() {
        let dir = TempDir::new().unwrap();
        sitepreview()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[preview]"))
            .stdout(predicate::str::contains("port_range_start = 8001"))
            .stdout(predicate::str::contains("timeout_minutes = 30"));
    }

    #[test]
    fn test_config_show_reads_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("sitepreview.toml"),
            "[preview]\ntimeout_minutes = 7\n",
        )
        .unwrap();
        sitepreview()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("timeout_minutes = 7"));
    }

    #[test]
    fn test_config_init_then_validate() {
        let dir = TempDir::new().unwrap();
        sitepreview()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success();
        assert!(dir.path().join("sitepreview.toml").exists());

        sitepreview()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."));
    }

    #[test]
    fn test_config_validate_reports_problems() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("sitepreview.toml"),
            "[preview]\nport_range_start = 9000\nport_range_end = 8000\n",
        )
        .unwrap();
        sitepreview()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("Empty port range"));
    }

    #[test]
    fn test_serve_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        sitepreview()
            .args(["serve", "--port", "47990", "--dir"])
            .arg(dir.path().join("absent"))
            .assert()
            .failure();
    }
}

// =============================================================================
// Real previews backed by `sitepreview serve`
// =============================================================================

mod previews {
    use super::*;

    #[tokio::test]
    async fn test_preview_serves_website() {
        let sites = websites(&["biz-A"]);
        let registry = registry_for(&sites, 48000..=48019);

        let snapshot = registry.create_or_get("biz-A").await.unwrap();
        assert!(snapshot.is_running);

        let body = fetch(&format!("http://127.0.0.1:{}/", snapshot.port)).await;
        assert_eq!(body.as_deref(), Some("<h1>biz-A</h1>"));

        assert!(registry.stop("biz-A").await);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(
            reqwest::get(format!("http://127.0.0.1:{}/", snapshot.port))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_two_previews_are_isolated() {
        let sites = websites(&["biz-A", "biz-B"]);
        let api = PreviewApi::new(registry_for(&sites, 48020..=48039));

        let a = api.start_preview("biz-A").await.preview.unwrap();
        let b = api.start_preview("biz-B").await.preview.unwrap();
        assert_ne!(a.port, b.port);

        let body_a = fetch(&format!("http://127.0.0.1:{}/", a.port)).await;
        let body_b = fetch(&format!("http://127.0.0.1:{}/", b.port)).await;
        assert_eq!(body_a.as_deref(), Some("<h1>biz-A</h1>"));
        assert_eq!(body_b.as_deref(), Some("<h1>biz-B</h1>"));

        let listed = api.list_all_previews().await;
        assert_eq!(listed.count, 2);

        assert!(api.stop_preview("biz-A").await.success);
        let listed = api.list_all_previews().await;
        assert_eq!(listed.count, 1);
        assert_eq!(listed.previews[0].business_id, "biz-B");
        assert!(!api.get_preview_status("biz-A").await.success);

        api.stop_preview("biz-B").await;
    }

    #[tokio::test]
    async fn test_single_port_range_is_exhausted_while_held() {
        let sites = websites(&["biz-A", "biz-B"]);
        let registry = registry_for(&sites, 48040..=48040);

        let held = registry.create_or_get("biz-A").await.unwrap();
        assert!(registry.create_or_get("biz-B").await.is_err());
        assert_eq!(registry.len().await, 1);

        // Independent of the registry's claim, the child's socket makes the
        // port fail the bind test.
        assert!(fetch(&format!("http://127.0.0.1:{}/", held.port)).await.is_some());
        let allocator = PortAllocator::new(held.port..=held.port);
        assert_eq!(allocator.allocate(&HashSet::new()), None);

        registry.stop_all().await;
    }
}
