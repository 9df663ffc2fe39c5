//! Business id → preview process map.
//!
//! Every mutation holds the registry lock for its whole duration
//! (allocate → spawn → register, stop → release → deregister), which keeps
//! at most one process per business id and no port handed out twice.

use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Mutex;

use super::models::PreviewSnapshot;
use super::ports::PortAllocator;
use super::process::{PreviewProcess, ServerCommand};
use crate::config::PreviewConfig;
use crate::errors::PreviewError;

/// Everything the registry needs to build new previews.
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    pub websites_dir: PathBuf,
    pub port_range: RangeInclusive<u16>,
    pub timeout_minutes: u64,
    pub startup_grace: Duration,
    pub stop_timeout: Duration,
    pub command: ServerCommand,
}

impl RegistrySettings {
    pub fn from_config(config: &PreviewConfig) -> Result<Self> {
        Ok(Self {
            websites_dir: config.websites_dir.clone(),
            port_range: config.port_range(),
            timeout_minutes: config.timeout_minutes,
            startup_grace: config.startup_grace(),
            stop_timeout: config.stop_timeout(),
            command: config.server_command()?,
        })
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: HashMap<String, PreviewProcess>,
    claimed_ports: HashSet<u16>,
}

impl RegistryState {
    fn release(&mut self, port: u16) {
        self.claimed_ports.remove(&port);
    }
}

/// Owns every live preview process.
#[derive(Debug)]
pub struct PreviewRegistry {
    settings: RegistrySettings,
    allocator: PortAllocator,
    state: Mutex<RegistryState>,
}

/// Business ids name a directory, so only a conservative character set is
/// accepted.
pub fn is_valid_business_id(business_id: &str) -> bool {
    !business_id.is_empty()
        && business_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl PreviewRegistry {
    pub fn new(settings: RegistrySettings) -> Self {
        let allocator = PortAllocator::new(settings.port_range.clone());
        Self {
            settings,
            allocator,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Directory served for `business_id`.
    pub fn website_dir(&self, business_id: &str) -> PathBuf {
        self.settings.websites_dir.join(business_id)
    }

    /// Return the running preview for `business_id`, starting one if needed.
    pub async fn create_or_get(&self, business_id: &str) -> Result<PreviewSnapshot, PreviewError> {
        if !is_valid_business_id(business_id) {
            return Err(PreviewError::InvalidBusinessId(business_id.to_string()));
        }

        let mut state = self.state.lock().await;

        if let Some(existing) = state.entries.get_mut(business_id) {
            if existing.is_running() {
                existing.touch();
                return Ok(existing.info());
            }
            let port = existing.port();
            tracing::info!(business_id, port, "Purging dead preview server");
            if let Some(mut dead) = state.entries.remove(business_id) {
                dead.stop().await;
            }
            state.release(port);
        }

        let Some(port) = self.allocator.allocate(&state.claimed_ports) else {
            let range = self.allocator.range();
            return Err(PreviewError::ResourceExhausted {
                start: *range.start(),
                end: *range.end(),
            });
        };
        state.claimed_ports.insert(port);

        let mut process = PreviewProcess::new(
            business_id,
            port,
            self.website_dir(business_id),
            self.settings.timeout_minutes,
            self.settings.stop_timeout,
        );

        if let Err(e) = process
            .start(&self.settings.command, self.settings.startup_grace)
            .await
        {
            state.release(port);
            return Err(e);
        }

        let snapshot = process.info();
        state.entries.insert(business_id.to_string(), process);
        Ok(snapshot)
    }

    /// Stop and forget the preview for `business_id`.
    ///
    /// Returns `false` when there was nothing to stop.
    pub async fn stop(&self, business_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(mut process) = state.entries.remove(business_id) else {
            return false;
        };
        process.stop().await;
        state.release(process.port());
        true
    }

    /// Stop `business_id` only if it is still reclaimable now.
    ///
    /// Returns `false` when the entry is gone, or was revived or touched since
    /// it was marked.
    pub async fn stop_if_reclaimable(&self, business_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let still_reclaimable = state
            .entries
            .get_mut(business_id)
            .is_some_and(PreviewProcess::is_reclaimable);
        if !still_reclaimable {
            return false;
        }
        let Some(mut process) = state.entries.remove(business_id) else {
            return false;
        };
        process.stop().await;
        state.release(process.port());
        true
    }

    /// Snapshot of a running preview; touches it. Dead entries read as absent
    /// but are left for the sweeper.
    pub async fn get_status(&self, business_id: &str) -> Option<PreviewSnapshot> {
        let mut state = self.state.lock().await;
        let process = state.entries.get_mut(business_id)?;
        if !process.is_running() {
            return None;
        }
        process.touch();
        Some(process.info())
    }

    /// Snapshots of every running preview, ordered by business id.
    pub async fn list_all(&self) -> Vec<PreviewSnapshot> {
        let mut state = self.state.lock().await;
        let mut previews: Vec<PreviewSnapshot> = state
            .entries
            .values_mut()
            .filter_map(|p| p.is_running().then(|| p.info()))
            .collect();
        previews.sort_by(|a, b| a.business_id.cmp(&b.business_id));
        previews
    }

    /// Ids of entries that are idle past their timeout or no longer running.
    pub async fn reclaimable(&self) -> Vec<String> {
        let mut state = self.state.lock().await;
        state
            .entries
            .iter_mut()
            .filter_map(|(id, p)| p.is_reclaimable().then(|| id.clone()))
            .collect()
    }

    /// Stop every preview and clear all state. Returns how many were stopped.
    pub async fn stop_all(&self) -> usize {
        let mut state = self.state.lock().await;
        let entries: Vec<(String, PreviewProcess)> = state.entries.drain().collect();
        let count = entries.len();
        for (business_id, mut process) in entries {
            tracing::debug!(business_id = %business_id, "Stopping preview server on shutdown");
            process.stop().await;
        }
        state.claimed_ports.clear();
        count
    }

    /// Number of registered entries, including dead ones not yet purged.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn claimed_ports(&self) -> HashSet<u16> {
        self.state.lock().await.claimed_ports.clone()
    }

    #[cfg(test)]
    pub(crate) async fn backdate(&self, business_id: &str, by: chrono::TimeDelta) {
        let mut state = self.state.lock().await;
        if let Some(process) = state.entries.get_mut(business_id) {
            process.backdate_last_access(by);
        }
    }

    #[cfg(test)]
    pub(crate) async fn pid_of(&self, business_id: &str) -> Option<u32> {
        let state = self.state.lock().await;
        state.entries.get(business_id).and_then(PreviewProcess::pid)
    }
}
