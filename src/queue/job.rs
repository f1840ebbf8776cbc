//! Job status record and its state machine

use crate::extractor::MediaSnapshot;
use crate::platforms::Platform;
use crate::utils::error::SocialFetchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle state of a job
///
/// `pending -> downloading -> {completed | retrying -> downloading | failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Pending,
    Downloading,
    Retrying,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Downloading => "downloading",
            JobState::Retrying => "retrying",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, Downloading)
                | (Downloading, Completed)
                | (Downloading, Retrying)
                | (Downloading, Failed)
                | (Retrying, Downloading)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status record of one requested download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub url: String,
    pub platform: Platform,
    pub quality: String,
    pub audio_only: bool,
    pub status: JobState,
    pub progress: f64,
    pub message: String,
    pub error: Option<String>,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub file_path: Option<PathBuf>,
    pub file_info: Option<MediaSnapshot>,
    /// Set when the engine reported one file finished; the next value starts a new file
    #[serde(skip)]
    file_boundary: bool,
}

impl Job {
    /// Create a pending job with a fresh id
    pub fn new(
        url: impl Into<String>,
        platform: Platform,
        quality: impl Into<String>,
        audio_only: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.into(),
            platform,
            quality: quality.into(),
            audio_only,
            status: JobState::Pending,
            progress: 0.0,
            message: "Download queued".to_string(),
            error: None,
            attempts: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            file_path: None,
            file_info: None,
            file_boundary: false,
        }
    }

    fn media_kind(&self) -> (&'static str, &'static str) {
        if self.audio_only {
            ("audio", "Audio")
        } else {
            ("video", "Video")
        }
    }

    fn transition(&mut self, next: JobState) -> Result<(), SocialFetchError> {
        if !self.status.can_transition_to(next) {
            return Err(SocialFetchError::InvalidTransition {
                id: self.id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Enter `downloading` for the given attempt; progress restarts at 0
    pub fn begin_attempt(
        &mut self,
        attempt: u32,
        max_attempts: u32,
    ) -> Result<(), SocialFetchError> {
        self.transition(JobState::Downloading)?;
        let (kind, _) = self.media_kind();
        self.attempts = attempt;
        self.progress = 0.0;
        self.file_boundary = false;
        self.started_at.get_or_insert_with(Utc::now);
        self.message = format!(
            "Starting {} download... (attempt {}/{})",
            kind, attempt, max_attempts
        );
        Ok(())
    }

    /// Write a progress value while downloading
    ///
    /// Returns false when the job is not downloading or the value would move
    /// the current file's progress backwards. The first value after
    /// [`Job::finish_file`] belongs to the next file and is always taken.
    pub fn record_progress(&mut self, percent: f64, message: String) -> bool {
        if self.status != JobState::Downloading || !percent.is_finite() {
            return false;
        }
        let percent = percent.clamp(0.0, 100.0);
        if !self.file_boundary && percent < self.progress {
            return false;
        }
        self.file_boundary = false;
        self.progress = percent;
        self.message = message;
        true
    }

    /// One file of the download is done; progress reads 100 until the next file starts
    pub fn finish_file(&mut self, message: String) -> bool {
        if self.status != JobState::Downloading {
            return false;
        }
        self.progress = 100.0;
        self.message = message;
        self.file_boundary = true;
        true
    }

    pub fn set_file_info(&mut self, snapshot: MediaSnapshot) {
        self.file_info = Some(snapshot);
    }

    /// Attempt failed with attempts remaining
    pub fn mark_retrying(
        &mut self,
        error: String,
        next_attempt: u32,
        max_attempts: u32,
    ) -> Result<(), SocialFetchError> {
        self.transition(JobState::Retrying)?;
        self.error = Some(error);
        self.message = format!(
            "Download failed, retrying... (attempt {}/{})",
            next_attempt, max_attempts
        );
        Ok(())
    }

    /// Terminal success; the output directory is always recorded
    pub fn complete(&mut self, output_dir: PathBuf) -> Result<(), SocialFetchError> {
        self.transition(JobState::Completed)?;
        let (_, kind) = self.media_kind();
        self.progress = 100.0;
        self.completed_at = Some(Utc::now());
        self.file_path = Some(output_dir);
        self.message = format!("{} download completed successfully", kind);
        Ok(())
    }

    /// Terminal failure; the error is kept verbatim
    pub fn fail(&mut self, error: String, message: String) -> Result<(), SocialFetchError> {
        self.transition(JobState::Failed)?;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
        self.message = message;
        Ok(())
    }
}
