//! HTTP API over the job manager

pub mod error;
pub mod files;
pub mod handlers;
pub mod schemas;

pub use error::ApiError;

use crate::queue::JobManager;
use crate::utils::config::AppSettings;
use anyhow::Context;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<JobManager>,
}

impl AppState {
    pub fn new(manager: Arc<JobManager>) -> Self {
        Self { manager }
    }
}

/// Credentialed CORS for the listed origins; methods and headers mirror the preflight
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Full route table: service routes at the root, the API under `/api/v1`
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/download", post(handlers::create_download))
        .route("/download/:id", get(handlers::get_download))
        .route("/downloads", get(handlers::list_downloads))
        .route("/files/:id", get(files::download_file))
        .route("/platforms", get(handlers::list_platforms))
        .route("/probe", post(handlers::probe));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(cors_layer(cors_origins))
}

/// Serve until ctrl-c, then wait for in-flight jobs
pub async fn serve(settings: &AppSettings, manager: Arc<JobManager>) -> anyhow::Result<()> {
    let bind_address = settings.bind_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Listening on http://{}", listener.local_addr()?);

    let app = router(
        AppState::new(Arc::clone(&manager)),
        &settings.cors_origins,
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    manager.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
