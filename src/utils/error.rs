//! Error handling for socialfetch

use thiserror::Error;

/// Main error type for socialfetch
#[derive(Debug, Error)]
pub enum SocialFetchError {
    #[error("yt-dlp not found. Please install yt-dlp")]
    YtDlpNotFound,

    #[error("Unsupported platform")]
    UnsupportedPlatform,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Download not found")]
    JobNotFound(String),

    #[error("Download not completed yet")]
    JobNotCompleted(String),

    #[error("{0}")]
    FileNotFound(String),

    #[error("Job already exists: {0}")]
    DuplicateJob(String),

    #[error("Invalid state transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: String,
        to: String,
    },

    #[error("Failed to extract media info: {0}")]
    ExtractionError(String),

    #[error("Download failed: {0}")]
    DownloadError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SocialFetchError {
    /// Whether the error was caused by the caller rather than by the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedPlatform
                | Self::InvalidUrl(_)
                | Self::JobNotFound(_)
                | Self::JobNotCompleted(_)
                | Self::FileNotFound(_)
        )
    }

    /// Client errors that name something which does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::JobNotFound(_) | Self::FileNotFound(_))
    }
}
