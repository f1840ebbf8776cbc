//! Job orchestrator: creates jobs and drives each one through its retry loop

use crate::downloader::{ProgressEvent, ProgressReporter};
use crate::extractor::{options, ExtractionEngine, MediaInfo, MediaSnapshot};
use crate::platforms::{self, Platform};
use crate::queue::job::Job;
use crate::queue::retry::{classify_failure, AttemptOutcome, RetryDecision, RetryPolicy};
use crate::queue::store::JobStore;
use crate::utils::config::AppSettings;
use crate::utils::error::SocialFetchError;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

const PROGRESS_CHANNEL_CAPACITY: usize = 100;

/// A caller's download request before platform resolution
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub url: String,
    pub platform: Option<String>,
    pub quality: String,
    pub audio_only: bool,
}

impl JobRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            platform: None,
            quality: "best".to_string(),
            audio_only: false,
        }
    }
}

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub downloads_root: PathBuf,
    pub policy: RetryPolicy,
    pub classify_permanent_failures: bool,
}

impl ManagerConfig {
    pub fn new(downloads_root: impl Into<PathBuf>) -> Self {
        Self {
            downloads_root: downloads_root.into(),
            policy: RetryPolicy::default(),
            classify_permanent_failures: false,
        }
    }

    /// `{downloads_root}/{platform}/{job_id}`
    pub fn job_dir(&self, platform: Platform, job_id: &str) -> PathBuf {
        self.downloads_root.join(platform.as_str()).join(job_id)
    }
}

impl From<&AppSettings> for ManagerConfig {
    fn from(settings: &AppSettings) -> Self {
        Self {
            downloads_root: settings.downloads_root.clone(),
            policy: RetryPolicy::new(settings.max_attempts, settings.retry_delay()),
            classify_permanent_failures: settings.classify_permanent_failures,
        }
    }
}

/// Owns the job status table and the background job tasks
pub struct JobManager {
    store: JobStore,
    engine: Arc<dyn ExtractionEngine>,
    config: Arc<ManagerConfig>,
    tasks: Mutex<JoinSet<()>>,
}

impl JobManager {
    pub fn new(engine: Arc<dyn ExtractionEngine>, config: ManagerConfig) -> Self {
        Self {
            store: JobStore::new(),
            engine,
            config: Arc::new(config),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Create the downloads root and one directory per platform
    pub async fn prepare_directories(&self) -> anyhow::Result<()> {
        for platform in Platform::ALL {
            let dir = self.config.downloads_root.join(platform.as_str());
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        info!("Downloads rooted at {}", self.config.downloads_root.display());
        Ok(())
    }

    /// Validate the URL and resolve the platform, detecting it when not given
    pub fn resolve(&self, request: &JobRequest) -> Result<(String, Platform), SocialFetchError> {
        let url = request.url.trim();
        let parsed =
            url::Url::parse(url).map_err(|e| SocialFetchError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(SocialFetchError::InvalidUrl(url.to_string()));
        }

        let platform = match request.platform.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => explicit.parse::<Platform>()?,
            _ => platforms::detect(url).ok_or(SocialFetchError::UnsupportedPlatform)?,
        };

        Ok((url.to_string(), platform))
    }

    /// Record a new pending job and start it in the background
    pub async fn submit(&self, request: JobRequest) -> Result<Job, SocialFetchError> {
        let (url, platform) = self.resolve(&request)?;
        let job = Job::new(url, platform, request.quality, request.audio_only);
        self.store.create(job.clone()).await?;

        let content_id =
            platforms::content_id(&job.url, platform).unwrap_or_else(|| "-".to_string());
        info!(job_id = %job.id, platform = %platform, content_id = %content_id, "Job submitted");

        let runner = JobRunner {
            id: job.id.clone(),
            store: self.store.clone(),
            engine: Arc::clone(&self.engine),
            config: Arc::clone(&self.config),
        };

        let mut tasks = self.tasks.lock().await;
        while tasks.try_join_next().is_some() {}
        tasks.spawn(runner.run());

        Ok(job)
    }

    pub async fn get(&self, id: &str) -> Result<Job, SocialFetchError> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| SocialFetchError::JobNotFound(id.to_string()))
    }

    pub async fn list(&self) -> Vec<Job> {
        self.store.list().await
    }

    /// Metadata-only extraction with the platform's options; nothing is downloaded
    pub async fn probe(
        &self,
        url: &str,
        platform: Platform,
        quality: &str,
        audio_only: bool,
    ) -> anyhow::Result<MediaInfo> {
        let options = options::build(platform, quality, audio_only);
        self.engine.extract_info(url, &options).await
    }

    /// Wait for every in-flight job to reach a terminal state
    pub async fn shutdown(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().await);
        if !tasks.is_empty() {
            info!("Waiting for {} job task(s) to finish", tasks.len());
        }
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!("Job task panicked: {}", e);
            }
        }
    }
}

/// Background unit of work for one job
struct JobRunner {
    id: String,
    store: JobStore,
    engine: Arc<dyn ExtractionEngine>,
    config: Arc<ManagerConfig>,
}

impl JobRunner {
    async fn run(self) {
        let policy = &self.config.policy;
        let max_attempts = policy.max_attempts();
        let mut attempt = 1;

        loop {
            if let Err(e) = self
                .store
                .try_update(&self.id, |job| job.begin_attempt(attempt, max_attempts))
                .await
            {
                error!("Job {} cannot start attempt {}: {}", self.id, attempt, e);
                return;
            }
            info!(
                "Job {} attempt {}/{} via {}",
                self.id,
                attempt,
                max_attempts,
                self.engine.id()
            );

            let outcome = self.run_attempt().await;

            let result = match policy.decide(attempt, &outcome) {
                RetryDecision::Complete { output_dir } => {
                    info!("Job {} completed into {}", self.id, output_dir.display());
                    self.store
                        .try_update(&self.id, |job| job.complete(output_dir))
                        .await
                }
                RetryDecision::Retry {
                    delay,
                    next_attempt,
                } => {
                    let error = outcome.error().unwrap_or_default().to_string();
                    warn!(
                        "Job {} attempt {} failed, retrying in {:?}: {}",
                        self.id, attempt, delay, error
                    );
                    if let Err(e) = self
                        .store
                        .try_update(&self.id, |job| {
                            job.mark_retrying(error, next_attempt, max_attempts)
                        })
                        .await
                    {
                        error!("Job {} cannot enter retrying: {}", self.id, e);
                        return;
                    }

                    tokio::time::sleep(delay).await;
                    attempt = next_attempt;
                    continue;
                }
                RetryDecision::Fail { error, exhausted } => {
                    let message = if exhausted {
                        format!("Download failed after {} attempts: {}", max_attempts, error)
                    } else {
                        format!("Download failed: {}", error)
                    };
                    error!("Job {} failed: {}", self.id, error);
                    self.store
                        .try_update(&self.id, |job| job.fail(error, message))
                        .await
                }
            };

            if let Err(e) = result {
                error!("Job {} could not record its final state: {}", self.id, e);
            }
            return;
        }
    }

    async fn run_attempt(&self) -> AttemptOutcome {
        match self.try_attempt().await {
            Ok(output_dir) => AttemptOutcome::Success { output_dir },
            Err(e) => classify_failure(e.to_string(), self.config.classify_permanent_failures),
        }
    }

    /// Metadata probe, then the download with progress drained alongside it
    async fn try_attempt(&self) -> anyhow::Result<PathBuf> {
        let job = self
            .store
            .get(&self.id)
            .await
            .ok_or_else(|| SocialFetchError::JobNotFound(self.id.clone()))?;

        let output_dir = self.config.job_dir(job.platform, &job.id);
        let options = options::build(job.platform, &job.quality, job.audio_only)
            .with_output_dir(&output_dir);

        // Not removed on failure; partial files from failed attempts stay on disk
        ensure_dir(&output_dir).await?;

        let info = self.engine.extract_info(&job.url, &options).await?;
        debug!("Job {} metadata: {:?}", self.id, info.title);
        self.store
            .update(&self.id, |j| j.set_file_info(MediaSnapshot::from(&info)))
            .await?;

        let (tx, rx) = mpsc::channel::<ProgressEvent>(PROGRESS_CHANNEL_CAPACITY);
        let reporter = ProgressReporter::new(self.id.clone(), self.store.clone());
        let (result, ()) = tokio::join!(
            self.engine.download(&job.url, &options, tx),
            reporter.drain(rx)
        );
        result?;

        Ok(output_dir)
    }
}

async fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))
}
