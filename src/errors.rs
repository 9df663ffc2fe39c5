//! Typed errors for the preview subsystem.
//!
//! `PreviewError` covers every reason a preview can fail to come up. Callers
//! outside the library see all of them as a single "start failure"; the
//! variants exist so the logs can tell them apart.

use std::path::PathBuf;

use thiserror::Error;

/// Reasons a preview could not be created.
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("No free port available in range {start}-{end}")]
    ResourceExhausted { start: u16, end: u16 },

    #[error("Website directory not found: {}", path.display())]
    MissingContent { path: PathBuf },

    #[error("Invalid business id '{0}'")]
    InvalidBusinessId(String),

    #[error("Failed to spawn preview server: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Preview server for {business_id} exited during startup")]
    ExitedDuringStartup { business_id: String },
}

impl PreviewError {
    /// Short, stable label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            PreviewError::ResourceExhausted { .. } => "resource_exhausted",
            PreviewError::MissingContent { .. } => "missing_content",
            PreviewError::InvalidBusinessId(_) => "invalid_business_id",
            PreviewError::SpawnFailed(_) => "spawn_failed",
            PreviewError::ExitedDuringStartup { .. } => "exited_during_startup",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_exhausted_carries_range() {
        let err = PreviewError::ResourceExhausted {
            start: 8001,
            end: 8999,
        };
        assert!(err.to_string().contains("8001-8999"));
        assert_eq!(err.kind(), "resource_exhausted");
    }

    #[test]
    fn missing_content_carries_path() {
        let err = PreviewError::MissingContent {
            path: PathBuf::from("/sites/biz-1"),
        };
        match &err {
            PreviewError::MissingContent { path } => {
                assert_eq!(path, &PathBuf::from("/sites/biz-1"));
            }
            _ => panic!("Expected MissingContent"),
        }
        assert!(err.to_string().contains("/sites/biz-1"));
    }

    #[test]
    fn spawn_failed_keeps_io_source() {
        use std::error::Error as _;
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such binary");
        let err = PreviewError::SpawnFailed(io_err);
        let source = err.source().expect("source should be set");
        assert!(source.to_string().contains("no such binary"));
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            PreviewError::ResourceExhausted { start: 1, end: 2 }.kind(),
            PreviewError::MissingContent {
                path: PathBuf::new(),
            }
            .kind(),
            PreviewError::InvalidBusinessId("x".into()).kind(),
            PreviewError::SpawnFailed(std::io::Error::other("x")).kind(),
            PreviewError::ExitedDuringStartup {
                business_id: "x".into(),
            }
            .kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }
}
