//! One static-file server child process.
//!
//! Each preview runs in its own process group so that stopping it reaches
//! every process the server command may have started, not just the leader.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::process::{Child, Command};

use super::models::{PreviewSnapshot, preview_url};
use crate::errors::PreviewError;

const PORT_PLACEHOLDER: &str = "{port}";
const DIR_PLACEHOLDER: &str = "{dir}";
const GROUP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Argv template used to launch a static-file server.
///
/// `{port}` and `{dir}` are substituted in every argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl ServerCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a full argv (`argv[0]` is the program).
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let Some((program, args)) = argv.split_first() else {
            bail!("server_command must not be empty");
        };
        Ok(Self::new(program, args.to_vec()))
    }

    /// This binary's own `serve` subcommand.
    pub fn current_exe() -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to get current executable path")?;
        Ok(Self::serve_with(exe))
    }

    /// `<exe> serve --port {port} --dir {dir}`.
    pub fn serve_with(exe: impl Into<PathBuf>) -> Self {
        Self::new(
            exe,
            vec![
                "serve".to_string(),
                "--port".to_string(),
                PORT_PLACEHOLDER.to_string(),
                "--dir".to_string(),
                DIR_PLACEHOLDER.to_string(),
            ],
        )
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments with placeholders filled in.
    pub fn render_args(&self, port: u16, dir: &Path) -> Vec<String> {
        let port = port.to_string();
        let dir = dir.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(PORT_PLACEHOLDER, &port)
                    .replace(DIR_PLACEHOLDER, &dir)
            })
            .collect()
    }

    fn build(&self, port: u16, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.render_args(port, dir))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        #[cfg(windows)]
        {
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }

        cmd
    }
}

/// A preview server bound to one port and serving one website directory.
#[derive(Debug)]
pub struct PreviewProcess {
    business_id: String,
    port: u16,
    website_dir: PathBuf,
    child: Option<Child>,
    /// Group of the spawned leader. Outlives the leader's handle so processes
    /// it left behind can still be signalled.
    pgid: Option<u32>,
    started_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    timeout_minutes: u64,
    stop_timeout: Duration,
}

impl PreviewProcess {
    pub fn new(
        business_id: impl Into<String>,
        port: u16,
        website_dir: impl Into<PathBuf>,
        timeout_minutes: u64,
        stop_timeout: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            business_id: business_id.into(),
            port,
            website_dir: website_dir.into(),
            child: None,
            pgid: None,
            started_at: now,
            last_accessed_at: now,
            timeout_minutes,
            stop_timeout,
        }
    }

    pub fn business_id(&self) -> &str {
        &self.business_id
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    /// Spawn the server and confirm it is still alive after `grace`.
    ///
    /// Nothing is spawned when the website directory is missing.
    pub async fn start(&mut self, command: &ServerCommand, grace: Duration) -> Result<(), PreviewError> {
        if !self.website_dir.is_dir() {
            return Err(PreviewError::MissingContent {
                path: self.website_dir.clone(),
            });
        }

        let child = command
            .build(self.port, &self.website_dir)
            .spawn()
            .map_err(PreviewError::SpawnFailed)?;

        let now = Utc::now();
        self.started_at = now;
        self.last_accessed_at = now;
        self.pgid = child.id();
        self.child = Some(child);

        tokio::time::sleep(grace).await;

        if self.is_running() {
            tracing::info!(
                business_id = %self.business_id,
                port = self.port,
                pid = self.pid(),
                "Preview server started"
            );
            Ok(())
        } else {
            // The leader is gone but may have left children in its group.
            self.stop().await;
            Err(PreviewError::ExitedDuringStartup {
                business_id: self.business_id.clone(),
            })
        }
    }

    pub(crate) fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Idle past the timeout, or no longer running.
    pub fn is_reclaimable(&mut self) -> bool {
        self.is_expired() || !self.is_running()
    }

    /// Non-blocking liveness check.
    pub fn is_running(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                tracing::debug!(business_id = %self.business_id, %status, "Preview server has exited");
                false
            }
            Err(e) => {
                tracing::warn!(business_id = %self.business_id, error = %e, "Failed to poll preview server");
                false
            }
        }
    }

    /// Terminate the process group: SIGTERM, bounded wait, then SIGKILL.
    ///
    /// The group is signalled even when the leader has already been reaped.
    /// A group that is already gone counts as stopped.
    pub async fn stop(&mut self) {
        let mut child = self.child.take();
        let Some(pgid) = self.pgid.take() else {
            return;
        };

        terminate(child.as_mut(), pgid);

        let graceful = tokio::time::timeout(
            self.stop_timeout,
            wait_for_exit(&self.business_id, child.as_mut(), pgid),
        )
        .await;

        if graceful.is_err() {
            tracing::warn!(
                business_id = %self.business_id,
                pgid,
                timeout_secs = self.stop_timeout.as_secs(),
                "Preview server ignored graceful shutdown, killing"
            );
            force_kill(child.as_mut(), pgid);
            if let Some(child) = child.as_mut() {
                if let Err(e) = child.wait().await {
                    tracing::warn!(business_id = %self.business_id, error = %e, "Failed to reap preview server");
                }
            }
        }

        tracing::info!(business_id = %self.business_id, port = self.port, "Preview server stopped");
    }

    /// Record an access. Never moves the timestamp backwards.
    pub fn touch(&mut self) {
        self.last_accessed_at = self.last_accessed_at.max(Utc::now());
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Idle-based expiry. Exactly `timeout_minutes` after the last access is
    /// not yet expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let minutes = i64::try_from(self.timeout_minutes).unwrap_or(i64::MAX);
        let timeout = TimeDelta::try_minutes(minutes).unwrap_or(TimeDelta::MAX);
        match self.last_accessed_at.checked_add_signed(timeout) {
            Some(expiry) => now > expiry,
            None => false,
        }
    }

    pub fn info(&mut self) -> PreviewSnapshot {
        PreviewSnapshot {
            business_id: self.business_id.clone(),
            port: self.port,
            url: preview_url(self.port),
            started_at: self.started_at,
            last_accessed_at: self.last_accessed_at,
            is_running: self.is_running(),
            timeout_minutes: self.timeout_minutes,
        }
    }

    #[cfg(test)]
    pub(crate) fn backdate_last_access(&mut self, by: TimeDelta) {
        self.last_accessed_at -= by;
    }
}

/// Reap the leader, then wait until no process is left in its group.
async fn wait_for_exit(business_id: &str, child: Option<&mut Child>, pgid: u32) {
    if let Some(child) = child {
        match child.wait().await {
            Ok(status) => tracing::debug!(business_id, %status, "Preview server exited"),
            Err(e) => tracing::warn!(business_id, error = %e, "Failed to wait for preview server"),
        }
    }
    while group_alive(pgid) {
        tokio::time::sleep(GROUP_POLL_INTERVAL).await;
    }
}

#[cfg(unix)]
fn terminate(_child: Option<&mut Child>, pgid: u32) {
    signal_group(pgid, libc::SIGTERM);
}

#[cfg(unix)]
fn force_kill(_child: Option<&mut Child>, pgid: u32) {
    signal_group(pgid, libc::SIGKILL);
}

#[cfg(not(unix))]
fn terminate(child: Option<&mut Child>, _pgid: u32) {
    if let Some(child) = child {
        if let Err(e) = child.start_kill() {
            tracing::warn!(error = %e, "Failed to terminate preview server");
        }
    }
}

#[cfg(not(unix))]
fn force_kill(child: Option<&mut Child>, pgid: u32) {
    terminate(child, pgid);
}

#[cfg(not(unix))]
fn group_alive(_pgid: u32) -> bool {
    false
}

/// Whether any process remains in the group.
#[cfg(unix)]
#[allow(unsafe_code)] // SAFETY: signal 0 only checks for existence
fn group_alive(pgid: u32) -> bool {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return false;
    };
    if unsafe { libc::killpg(pgid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

/// Signal every process in the group.
#[cfg(unix)]
#[allow(unsafe_code)] // SAFETY: killpg has no memory-safety preconditions
fn signal_group(pgid: u32, signal: libc::c_int) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    let rc = unsafe { libc::killpg(pgid, signal) };
    if rc == -1 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pgid, signal, error = %err, "Failed to signal preview process group");
        }
    }
}
