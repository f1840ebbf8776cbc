//! Progress reporting for active downloads
//!
//! The engine pushes [`ProgressEvent`]s into a channel; a [`ProgressReporter`]
//! owned by the job's task drains it and writes into the job status record.

use crate::queue::JobStore;
use tokio::sync::mpsc;
use tracing::debug;

/// Progress event emitted by the extraction engine during one download call
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Downloading {
        downloaded_bytes: u64,
        total_bytes: Option<u64>,
        total_bytes_estimate: Option<u64>,
    },
    Finished,
}

impl ProgressEvent {
    /// Percentage (0 to 100) of a downloading event with a known or estimated total
    pub fn percentage(&self) -> Option<f64> {
        match self {
            ProgressEvent::Downloading {
                downloaded_bytes,
                total_bytes,
                total_bytes_estimate,
            } => {
                let total = total_bytes
                    .filter(|t| *t > 0)
                    .or(total_bytes_estimate.filter(|t| *t > 0))?;
                let pct = *downloaded_bytes as f64 / total as f64 * 100.0;
                Some(pct.clamp(0.0, 100.0))
            }
            ProgressEvent::Finished => Some(100.0),
        }
    }
}

/// Applies progress events to one job's status record
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    job_id: String,
    store: JobStore,
}

impl ProgressReporter {
    pub fn new(job_id: impl Into<String>, store: JobStore) -> Self {
        Self {
            job_id: job_id.into(),
            store,
        }
    }

    /// Apply one event; returns whether the record changed
    pub async fn apply(&self, event: ProgressEvent) -> bool {
        let applied = match &event {
            ProgressEvent::Finished => {
                debug!("Job {} finished a file", self.job_id);
                let message = "Download completed, processing...".to_string();
                self.store
                    .update(&self.job_id, |job| job.finish_file(message))
                    .await
            }
            ProgressEvent::Downloading { .. } => {
                let Some(percent) = event.percentage() else {
                    return false;
                };
                debug!("Job {} progress {:.1}%", self.job_id, percent);
                let message = format!("Downloading... {:.1}%", percent);
                self.store
                    .update(&self.job_id, |job| job.record_progress(percent, message))
                    .await
            }
        };

        applied.unwrap_or(false)
    }

    /// Apply events until every sender is dropped
    pub async fn drain(&self, mut rx: mpsc::Receiver<ProgressEvent>) {
        while let Some(event) = rx.recv().await {
            self.apply(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::Platform;
    use crate::queue::{Job, JobState};

    fn downloading(done: u64, total: Option<u64>, estimate: Option<u64>) -> ProgressEvent {
        ProgressEvent::Downloading {
            downloaded_bytes: done,
            total_bytes: total,
            total_bytes_estimate: estimate,
        }
    }

    async fn store_with_active_job() -> (JobStore, String) {
        let store = JobStore::new();
        let job = Job::new("https://tiktok.com/@u/video/1", Platform::TikTok, "best", false);
        let id = job.id.clone();
        store.create(job).await.unwrap();
        store.try_update(&id, |j| j.begin_attempt(1, 3)).await.unwrap();
        (store, id)
    }

    #[test]
    fn test_percentage_prefers_exact_total() {
        assert_eq!(downloading(50, Some(200), Some(100)).percentage(), Some(25.0));
        assert_eq!(downloading(50, None, Some(100)).percentage(), Some(50.0));
        assert_eq!(downloading(50, Some(0), Some(100)).percentage(), Some(50.0));
        assert_eq!(downloading(50, None, None).percentage(), None);
        assert_eq!(downloading(500, Some(100), None).percentage(), Some(100.0));
        assert_eq!(ProgressEvent::Finished.percentage(), Some(100.0));
    }

    #[tokio::test]
    async fn test_apply_writes_progress_and_message() {
        let (store, id) = store_with_active_job().await;
        let reporter = ProgressReporter::new(&id, store.clone());

        assert!(reporter.apply(downloading(1, Some(3), None)).await);
        let job = store.get(&id).await.unwrap();
        assert!((job.progress - 33.333).abs() < 0.01);
        assert_eq!(job.message, "Downloading... 33.3%");

        assert!(!reporter.apply(downloading(1, None, None)).await);
    }

    #[tokio::test]
    async fn test_finished_forces_100_without_completing() {
        let (store, id) = store_with_active_job().await;
        let reporter = ProgressReporter::new(&id, store.clone());

        reporter.apply(ProgressEvent::Finished).await;
        let job = store.get(&id).await.unwrap();
        assert_eq!(job.progress, 100.0);
        assert_eq!(job.message, "Download completed, processing...");
        assert_eq!(job.status, JobState::Downloading);
    }

    #[tokio::test]
    async fn test_sidecar_finish_does_not_freeze_media_progress() {
        let (store, id) = store_with_active_job().await;
        let reporter = ProgressReporter::new(&id, store.clone());

        assert!(reporter.apply(ProgressEvent::Finished).await);
        assert!(reporter.apply(downloading(10, Some(100), None)).await);
        let job = store.get(&id).await.unwrap();
        assert_eq!(job.progress, 10.0);
        assert_eq!(job.message, "Downloading... 10.0%");

        assert!(reporter.apply(downloading(40, Some(100), None)).await);
        assert!(!reporter.apply(downloading(20, Some(100), None)).await);
        let job = store.get(&id).await.unwrap();
        assert_eq!(job.progress, 40.0);
        assert_eq!(job.message, "Downloading... 40.0%");
    }

    #[tokio::test]
    async fn test_drain_applies_in_order() {
        let (store, id) = store_with_active_job().await;
        let reporter = ProgressReporter::new(&id, store.clone());
        let (tx, rx) = mpsc::channel(8);

        tx.send(downloading(10, Some(100), None)).await.unwrap();
        tx.send(downloading(60, Some(100), None)).await.unwrap();
        tx.send(downloading(30, Some(100), None)).await.unwrap();
        drop(tx);

        reporter.drain(rx).await;
        assert_eq!(store.get(&id).await.unwrap().progress, 60.0);
    }

    #[tokio::test]
    async fn test_unknown_job_is_ignored() {
        let reporter = ProgressReporter::new("missing", JobStore::new());
        assert!(!reporter.apply(ProgressEvent::Finished).await);
    }
}
