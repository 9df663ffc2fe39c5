use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time copy of a preview's observable state.
///
/// Snapshots are plain values: holding one never keeps a process alive and
/// gives no way to signal it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSnapshot {
    pub business_id: String,
    pub port: u16,
    pub url: String,
    pub started_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub is_running: bool,
    pub timeout_minutes: u64,
}

/// URL a preview on `port` is reachable at.
pub fn preview_url(port: u16) -> String {
    format!("http://localhost:{}", port)
}
