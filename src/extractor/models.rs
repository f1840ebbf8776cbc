//! Data structures for extracted media information

use serde::{Deserialize, Serialize};

/// Longest description kept in a job snapshot, in characters
const DESCRIPTION_LIMIT: usize = 200;

/// Media information as reported by `yt-dlp --dump-json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaInfo {
    pub id: String,
    pub title: Option<String>,
    #[serde(alias = "webpage_url")]
    pub url: String,
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub formats: Vec<Format>,
    pub extractor: Option<String>,
}

/// Media format information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Format {
    pub format_id: String,
    pub ext: String,
    pub resolution: Option<String>,
    pub filesize: Option<u64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub height: Option<u32>,
}

/// Metadata snapshot stored on a job before its download starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSnapshot {
    pub title: String,
    pub uploader: String,
    pub duration: Option<f64>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub description: String,
}

impl From<&MediaInfo> for MediaSnapshot {
    fn from(info: &MediaInfo) -> Self {
        let description = match info.description.as_deref() {
            Some(text) if !text.is_empty() => {
                let truncated: String = text.chars().take(DESCRIPTION_LIMIT).collect();
                format!("{}...", truncated)
            }
            _ => String::new(),
        };

        Self {
            title: info.title.clone().unwrap_or_else(|| "Unknown".to_string()),
            uploader: info.uploader.clone().unwrap_or_else(|| "Unknown".to_string()),
            duration: info.duration,
            view_count: info.view_count,
            like_count: info.like_count,
            description,
        }
    }
}
