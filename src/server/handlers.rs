//! JSON endpoint handlers

use super::error::ApiError;
use super::schemas::{
    DownloadRequest, DownloadResponse, HistoryResponse, PlatformEntry, PlatformsResponse,
    ProbeInfo, ProbeResponse,
};
use super::AppState;
use crate::platforms;
use crate::queue::{Job, JobRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::{info, warn};

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Social Media Downloader API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// `POST /api/v1/download`
pub async fn create_download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let Json(request) = payload?;
    let job = state.manager.submit(request.into()).await?;
    info!("Accepted download {} for {}", job.id, job.platform);
    Ok(Json(DownloadResponse::from(&job)))
}

/// `GET /api/v1/download/:id`
pub async fn get_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.manager.get(&id).await?))
}

/// `GET /api/v1/downloads`
pub async fn list_downloads(State(state): State<AppState>) -> Json<HistoryResponse> {
    let downloads = state.manager.list().await;
    Json(HistoryResponse {
        total: downloads.len(),
        downloads,
    })
}

/// `GET /api/v1/platforms`
pub async fn list_platforms() -> Json<PlatformsResponse> {
    Json(PlatformsResponse {
        platforms: platforms::catalog().iter().map(PlatformEntry::from).collect(),
    })
}

/// `POST /api/v1/probe`
///
/// Runs metadata extraction with the same options a download would use.
/// Extraction failures are reported in the body rather than as an HTTP error.
pub async fn probe(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Json<ProbeResponse>, ApiError> {
    let Json(request) = payload?;
    let request = JobRequest::from(request);
    let (url, platform) = state.manager.resolve(&request)?;

    let response = match state
        .manager
        .probe(&url, platform, &request.quality, request.audio_only)
        .await
    {
        Ok(info) => ProbeResponse::Success {
            message: format!("{} extraction successful", platform.profile().display_name),
            info: ProbeInfo::from(&info),
        },
        Err(e) => {
            warn!("Probe of {} failed: {}", url, e);
            ProbeResponse::Error {
                message: format!("{} extraction failed", platform.profile().display_name),
                error: e.to_string(),
            }
        }
    };

    Ok(Json(response))
}
