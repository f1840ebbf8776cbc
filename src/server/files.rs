//! Serving finished media files

use super::error::ApiError;
use super::AppState;
use crate::queue::JobState;
use crate::utils::error::SocialFetchError;
use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::header;
use axum::response::Response;
use std::io;
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

pub const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "m4a", "opus", "aac", "wav"];
pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "webm", "mkv", "avi", "mov"];

/// A media file picked out of a job directory
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub content_type: &'static str,
}

/// Find the file to serve for a job directory.
///
/// Audio extensions are only considered for audio-only jobs and win over
/// video. Within an extension the first file by name is chosen.
pub async fn locate_media_file(dir: &Path, audio_only: bool) -> io::Result<Option<MediaFile>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let find = |ext: &str| {
        files
            .iter()
            .find(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map_or(false, |e| e.eq_ignore_ascii_case(ext))
            })
            .cloned()
    };

    if audio_only {
        for ext in AUDIO_EXTENSIONS {
            if let Some(path) = find(ext) {
                return Ok(Some(MediaFile {
                    path,
                    content_type: "audio/mpeg",
                }));
            }
        }
    }

    for ext in VIDEO_EXTENSIONS {
        if let Some(path) = find(ext) {
            return Ok(Some(MediaFile {
                path,
                content_type: "video/mp4",
            }));
        }
    }

    Ok(None)
}

/// `attachment` disposition with an ASCII fallback name and an RFC 5987 UTF-8 name
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if fallback == file_name {
        return format!("attachment; filename=\"{}\"", file_name);
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}

/// `GET /api/v1/files/:id`
pub async fn download_file(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
) -> Result<Response, ApiError> {
    let job = state.manager.get(&id).await?;

    if job.status != JobState::Completed {
        return Err(SocialFetchError::JobNotCompleted(id).into());
    }

    let dir = job
        .file_path
        .ok_or_else(|| SocialFetchError::FileNotFound("File path not found".to_string()))?;

    if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
        warn!("Job {} directory {} is gone", id, dir.display());
        let missing = SocialFetchError::FileNotFound("Download directory not found".to_string());
        return Err(missing.into());
    }

    let media = locate_media_file(&dir, job.audio_only)
        .await
        .map_err(SocialFetchError::from)?
        .ok_or_else(|| SocialFetchError::FileNotFound("No media file found".to_string()))?;

    let file_name = media
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.bin", id));

    let file = tokio::fs::File::open(&media.path)
        .await
        .map_err(SocialFetchError::from)?;
    debug!("Serving {} for job {}", media.path.display(), id);

    Response::builder()
        .header(header::CONTENT_TYPE, media.content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition(&file_name))
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(ApiError::internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) {
        std::fs::write(dir.path().join(name), b"x").unwrap();
    }

    #[tokio::test]
    async fn test_video_job_ignores_audio_files() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "clip.mp3");
        touch(&dir, "clip.webm");
        touch(&dir, "clip.info.json");

        let media = locate_media_file(dir.path(), false).await.unwrap().unwrap();
        assert_eq!(media.path, dir.path().join("clip.webm"));
        assert_eq!(media.content_type, "video/mp4");
    }

    #[tokio::test]
    async fn test_audio_job_prefers_audio() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "clip.mp4");
        touch(&dir, "clip.m4a");

        let media = locate_media_file(dir.path(), true).await.unwrap().unwrap();
        assert_eq!(media.path, dir.path().join("clip.m4a"));
        assert_eq!(media.content_type, "audio/mpeg");
    }

    #[tokio::test]
    async fn test_extension_order_beats_name_order() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "a.mkv");
        touch(&dir, "z.mp4");
        touch(&dir, "b.mp4");

        let media = locate_media_file(dir.path(), false).await.unwrap().unwrap();
        assert_eq!(media.path, dir.path().join("b.mp4"));
    }

    #[tokio::test]
    async fn test_no_media_file() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "clip.part");
        assert!(locate_media_file(dir.path(), true).await.unwrap().is_none());
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("clip.mp4"),
            "attachment; filename=\"clip.mp4\""
        );
        assert_eq!(
            content_disposition("café \"x\".mp4"),
            "attachment; filename=\"caf_ _x_.mp4\"; filename*=UTF-8''caf%C3%A9%20%22x%22.mp4"
        );
        assert_eq!(
            content_disposition("日本~v1.0-a_b.webm"),
            "attachment; filename=\"__~v1.0-a_b.webm\"; \
             filename*=UTF-8''%E6%97%A5%E6%9C%AC~v1.0-a_b.webm"
        );
    }
}
