//! The static-file server each preview process runs.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::server::shutdown_signal;

/// Router serving `dir`, with `index.html` for directory requests.
pub fn site_router(dir: &Path) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(dir).append_index_html_on_directories(true))
        .layer(TraceLayer::new_for_http())
}

/// Serve `dir` on `127.0.0.1:port` until SIGTERM or Ctrl-C.
pub async fn serve_directory(port: u16, dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Website directory not found: {}", dir.display());
    }

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(%addr, dir = %dir.display(), "Serving website");

    axum::serve(listener, site_router(dir))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Static server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Joe's Diner</h1>").unwrap();
        std::fs::create_dir(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css/style.css"), "body{}").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_root_serves_index() {
        let dir = site();
        let resp = site_router(dir.path())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"<h1>Joe's Diner</h1>");
    }

    #[tokio::test]
    async fn test_serves_assets() {
        let dir = site();
        let resp = site_router(dir.path())
            .oneshot(Request::builder().uri("/css/style.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let dir = site();
        let resp = site_router(dir.path())
            .oneshot(Request::builder().uri("/nope.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serve_directory_rejects_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = serve_directory(0, &dir.path().join("absent")).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
