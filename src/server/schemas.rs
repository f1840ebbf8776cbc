//! Request and response bodies of the HTTP API

use crate::extractor::MediaInfo;
use crate::platforms::{Platform, PlatformProfile};
use crate::queue::{Job, JobRequest};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub audio_only: Option<bool>,
}

impl From<DownloadRequest> for JobRequest {
    fn from(req: DownloadRequest) -> Self {
        Self {
            url: req.url,
            platform: req.platform,
            quality: req
                .quality
                .filter(|q| !q.trim().is_empty())
                .unwrap_or_else(|| "best".to_string()),
            audio_only: req.audio_only.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub id: String,
    pub url: String,
    pub platform: Platform,
    pub status: String,
}

impl From<&Job> for DownloadResponse {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            url: job.url.clone(),
            platform: job.platform,
            status: "started".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub downloads: Vec<Job>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformEntry {
    pub name: &'static str,
    pub display_name: &'static str,
    pub supported_content: &'static [&'static str],
}

impl From<&PlatformProfile> for PlatformEntry {
    fn from(profile: &PlatformProfile) -> Self {
        Self {
            name: profile.name,
            display_name: profile.display_name,
            supported_content: profile.supported_content,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformsResponse {
    pub platforms: Vec<PlatformEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeInfo {
    pub title: String,
    pub uploader: String,
    pub duration: Option<f64>,
    pub formats: usize,
    pub thumbnail: Option<String>,
}

impl From<&MediaInfo> for ProbeInfo {
    fn from(info: &MediaInfo) -> Self {
        Self {
            title: info.title.clone().unwrap_or_else(|| "Unknown".to_string()),
            uploader: info.uploader.clone().unwrap_or_else(|| "Unknown".to_string()),
            duration: info.duration,
            formats: info.formats.len(),
            thumbnail: info.thumbnail.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProbeResponse {
    Success { message: String, info: ProbeInfo },
    Error { message: String, error: String },
}
