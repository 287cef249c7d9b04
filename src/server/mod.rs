//! HTTP conversion service.
//!
//! Exposes the converter to browsers and scripts: an embedded upload page
//! at `/`, a health probe, and two multipart endpoints that parse an
//! uploaded `.eml` to JSON or stream back the rendered PDF. Parsing and
//! rendering are synchronous, so handlers run them on the blocking pool
//! with a per-request scratch directory that is removed when the request
//! completes.

mod handlers;

use std::path::PathBuf;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;

/// Shared state available to request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Maximum accepted request body size, in bytes.
    pub max_upload_bytes: usize,
    /// Base directory for per-request scratch space; the system temp
    /// directory when `None`.
    pub upload_dir: Option<PathBuf>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        AppState {
            max_upload_bytes: config.server.max_upload_mb * 1024 * 1024,
            upload_dir: config.server.upload_dir.clone(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Builds the application router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/parse-eml", post(handlers::parse_eml))
        .route("/api/convert-to-pdf", post(handlers::convert_to_pdf))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves the API until the task is aborted.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("conversion service listening on http://{addr}");
    axum::serve(listener, app).await
}
