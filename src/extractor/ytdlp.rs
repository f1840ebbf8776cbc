//! yt-dlp wrapper implementing the extraction engine
//!
//! This module drives the `yt-dlp` binary as a child process. Metadata comes
//! from `--dump-json`; downloads report progress through a machine-readable
//! `--progress-template` that is parsed line by line.

use crate::downloader::ProgressEvent;
use crate::extractor::models::MediaInfo;
use crate::extractor::options::ExtractionOptions;
use crate::extractor::traits::ExtractionEngine;
use crate::utils::error::SocialFetchError;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command as AsyncCommand;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const PROGRESS_PREFIX: &str = "[progress]";

/// `[progress] <status> <downloaded> <total> <estimate>`
const PROGRESS_TEMPLATE: &str = "download:[progress] %(progress.status)s %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s";

/// Engine backed by a yt-dlp executable
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    ytdlp_path: PathBuf,
}

impl YtDlpEngine {
    /// Locate yt-dlp and build the engine
    ///
    /// Search order:
    /// 1. Next to the current executable
    /// 2. System PATH
    /// 3. Common installation paths (Homebrew, pip user installs)
    pub fn new() -> Result<Self> {
        let ytdlp_path = match find_ytdlp() {
            Some(path) => {
                info!("Found yt-dlp at: {}", path.display());
                path
            }
            None => {
                error!("yt-dlp not found anywhere!");
                return Err(SocialFetchError::YtDlpNotFound.into());
            }
        };

        Ok(Self { ytdlp_path })
    }

    /// Use an explicitly configured binary
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let ytdlp_path = path.into();
        if !ytdlp_path.is_file() {
            return Err(SocialFetchError::YtDlpNotFound.into());
        }
        Ok(Self { ytdlp_path })
    }

    /// Get the path to yt-dlp being used
    pub fn ytdlp_path(&self) -> &Path {
        &self.ytdlp_path
    }
}

#[async_trait]
impl ExtractionEngine for YtDlpEngine {
    fn id(&self) -> &'static str {
        "yt-dlp"
    }

    async fn extract_info(&self, url: &str, options: &ExtractionOptions) -> Result<MediaInfo> {
        debug!("Extracting media info for URL: {}", url);

        let output = AsyncCommand::new(&self.ytdlp_path)
            .args(options.metadata_args())
            .arg("--no-warnings")
            .arg(url)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.ytdlp_path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<String> = stderr.lines().map(str::to_string).collect();
            let message = failure_message(&lines, output.status);
            error!("yt-dlp extraction failed: {}", message);
            return Err(SocialFetchError::ExtractionError(message).into());
        }

        let json_str = String::from_utf8(output.stdout)?;
        // Multi-entry URLs print one JSON document per line; the first entry describes the job
        let first = json_str
            .lines()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| anyhow!("yt-dlp returned no metadata"))?;
        let info: MediaInfo = serde_json::from_str(first).map_err(SocialFetchError::from)?;

        Ok(info)
    }

    async fn download(
        &self,
        url: &str,
        options: &ExtractionOptions,
        progress: mpsc::Sender<ProgressEvent>,
    ) -> Result<()> {
        let mut args = options.to_args();
        args.push("--newline".to_string());
        args.push("--progress-template".to_string());
        args.push(PROGRESS_TEMPLATE.to_string());
        args.push(url.to_string());

        debug!("Running yt-dlp with {} args for {}", args.len(), url);

        let mut child = AsyncCommand::new(&self.ytdlp_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", self.ytdlp_path.display()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("yt-dlp stdout unavailable"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("yt-dlp stderr unavailable"))?;

        let stderr_task = tokio::spawn(collect_lines(stderr));

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(event) = parse_progress_line(&line) {
                if progress.send(event).await.is_err() {
                    debug!("Progress receiver dropped; continuing download");
                }
            }
        }

        let status = child.wait().await?;
        let stderr_lines = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let message = failure_message(&stderr_lines, status);
            warn!("yt-dlp download failed: {}", message);
            return Err(SocialFetchError::DownloadError(message).into());
        }

        Ok(())
    }
}

/// Parse one stdout line produced with [`PROGRESS_TEMPLATE`]
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = rest.split_whitespace();

    let status = fields.next()?;
    let downloaded = fields.next().and_then(parse_bytes);
    let total = fields.next().and_then(parse_bytes);
    let estimate = fields.next().and_then(parse_bytes);

    match status {
        "finished" => Some(ProgressEvent::Finished),
        "downloading" => Some(ProgressEvent::Downloading {
            downloaded_bytes: downloaded?,
            total_bytes: total,
            total_bytes_estimate: estimate,
        }),
        _ => None,
    }
}

/// yt-dlp prints "NA" for unknown values and floats for estimates
fn parse_bytes(field: &str) -> Option<u64> {
    if field == "NA" || field == "None" {
        return None;
    }
    field
        .parse::<u64>()
        .ok()
        .or_else(|| field.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64))
}

/// Last `ERROR:` line, else the last non-empty line, else the exit status
fn failure_message(stderr: &[String], status: ExitStatus) -> String {
    stderr
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| stderr.iter().rev().find(|l| !l.trim().is_empty()))
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| format!("yt-dlp exited with {}", status))
}

async fn collect_lines<R: AsyncRead + Unpin>(reader: R) -> Vec<String> {
    let mut lines = BufReader::new(reader).lines();
    let mut collected = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        collected.push(line);
    }
    collected
}

// ============================================================
// yt-dlp Detection Functions
// ============================================================

/// Find yt-dlp binary with priority:
/// 1. Next to the executable
/// 2. System PATH
/// 3. Common installation paths
pub fn find_ytdlp() -> Option<PathBuf> {
    if let Some(adjacent) = find_adjacent_ytdlp() {
        info!("✓ Using bundled yt-dlp: {:?}", adjacent);
        return Some(adjacent);
    }

    if let Ok(path) = which::which("yt-dlp") {
        info!("✓ Using system yt-dlp: {:?}", path);
        return Some(path);
    }

    if let Some(common) = find_in_common_paths() {
        info!("✓ Using yt-dlp from common path: {:?}", common);
        return Some(common);
    }

    warn!("✗ yt-dlp not found anywhere!");
    None
}

fn find_adjacent_ytdlp() -> Option<PathBuf> {
    let exe_path = std::env::current_exe().ok()?;
    let exe_dir = exe_path.parent()?;
    let binary_name = if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else {
        "yt-dlp"
    };

    let candidate = exe_dir.join(binary_name);
    if candidate.exists() && is_executable(&candidate) {
        return Some(candidate);
    }
    None
}

fn find_in_common_paths() -> Option<PathBuf> {
    let mut candidates = vec![
        PathBuf::from("/opt/homebrew/bin/yt-dlp"),
        PathBuf::from("/usr/local/bin/yt-dlp"),
        PathBuf::from("/usr/bin/yt-dlp"),
    ];
    if let Some(home) = std::env::var_os("HOME") {
        candidates.push(PathBuf::from(home).join(".local/bin/yt-dlp"));
    }

    candidates
        .into_iter()
        .find(|path| path.exists() && is_executable(path))
}

/// Check if a file is executable
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if let Ok(metadata) = std::fs::metadata(path) {
            return metadata.is_file() && metadata.permissions().mode() & 0o111 != 0;
        }
        false
    }

    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

// ============================================================
// Tests
// ============================================================
