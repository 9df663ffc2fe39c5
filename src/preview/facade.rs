//! Request-level operations with serializable results.
//!
//! The facade holds no state of its own. Every failure is reported through
//! the `error` field; details stay in the logs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::models::PreviewSnapshot;
use super::registry::PreviewRegistry;
use crate::errors::PreviewError;

pub const START_FAILED: &str = "Failed to start preview server";
pub const NOT_FOUND: &str = "Preview server not found";
pub const NOT_RUNNING: &str = "Preview server not running";
pub const STOPPED: &str = "Preview server stopped";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<PreviewSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<PreviewSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResult {
    pub success: bool,
    pub previews: Vec<PreviewSnapshot>,
    pub count: usize,
}

/// Thin translation layer over [`PreviewRegistry`].
#[derive(Clone)]
pub struct PreviewApi {
    registry: Arc<PreviewRegistry>,
}

impl PreviewApi {
    pub fn new(registry: Arc<PreviewRegistry>) -> Self {
        Self { registry }
    }

    pub async fn start_preview(&self, business_id: &str) -> StartResult {
        match self.registry.create_or_get(business_id).await {
            Ok(snapshot) => StartResult {
                success: true,
                preview: Some(snapshot),
                error: None,
            },
            Err(e) => {
                log_start_failure(business_id, &e);
                StartResult {
                    success: false,
                    preview: None,
                    error: Some(START_FAILED.to_string()),
                }
            }
        }
    }

    pub async fn stop_preview(&self, business_id: &str) -> StopResult {
        if self.registry.stop(business_id).await {
            StopResult {
                success: true,
                message: Some(STOPPED.to_string()),
                error: None,
            }
        } else {
            StopResult {
                success: false,
                message: None,
                error: Some(NOT_FOUND.to_string()),
            }
        }
    }

    pub async fn get_preview_status(&self, business_id: &str) -> StatusResult {
        match self.registry.get_status(business_id).await {
            Some(snapshot) => StatusResult {
                success: true,
                preview: Some(snapshot),
                error: None,
            },
            None => StatusResult {
                success: false,
                preview: None,
                error: Some(NOT_RUNNING.to_string()),
            },
        }
    }

    pub async fn list_all_previews(&self) -> ListResult {
        let previews = self.registry.list_all().await;
        ListResult {
            success: true,
            count: previews.len(),
            previews,
        }
    }
}

fn log_start_failure(business_id: &str, err: &PreviewError) {
    match err {
        PreviewError::MissingContent { path } => {
            tracing::error!(business_id, path = %path.display(), kind = err.kind(), "Website path not found");
        }
        PreviewError::ResourceExhausted { .. } => {
            tracing::error!(business_id, kind = err.kind(), "No available ports for preview server");
        }
        _ => {
            tracing::error!(business_id, kind = err.kind(), error = %err, "Preview server failed to start");
        }
    }
}
