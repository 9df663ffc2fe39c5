use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::api::{self, AppState};
use crate::config::PreviewConfig;
use crate::preview::{PreviewApi, PreviewManager, PreviewRegistry, RegistrySettings};

/// Configuration for the management API server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub preview: PreviewConfig,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3141,
            preview: PreviewConfig::default(),
            dev_mode: false,
        }
    }
}

/// Build the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the management API until Ctrl-C / SIGTERM, then stop every preview.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let settings = RegistrySettings::from_config(&config.preview)?;
    let registry = Arc::new(PreviewRegistry::new(settings));
    let manager = PreviewManager::new(Arc::clone(&registry), config.preview.sweep_interval());

    let state = Arc::new(AppState {
        previews: PreviewApi::new(Arc::clone(&registry)),
    });

    let mut app = build_router(state);
    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    let local_addr = listener.local_addr()?;

    manager.start().await;
    tracing::info!(
        addr = %local_addr,
        websites_dir = %config.preview.websites_dir.display(),
        "Preview API listening"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    // Runs on the error path too so no preview outlives this process.
    manager.shutdown().await;
    served?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_router() -> Router {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PreviewConfig::default();
        config.websites_dir = dir.path().to_path_buf();
        config.server_command = Some(vec!["sleep".into(), "{port}".into()]);
        let settings = RegistrySettings::from_config(&config).unwrap();
        let state = Arc::new(AppState {
            previews: PreviewApi::new(Arc::new(PreviewRegistry::new(settings))),
        });
        build_router(state)
    }

    #[tokio::test]
    async fn test_health_via_full_router() {
        let app = test_router();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = test_router();
        let req = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3141);
        assert_eq!(config.preview, PreviewConfig::default());
        assert!(!config.dev_mode);
    }
}
