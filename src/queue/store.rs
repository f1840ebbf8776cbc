//! In-memory job status store shared by the orchestrator and progress reporters

use crate::queue::job::Job;
use crate::utils::error::SocialFetchError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Task-safe map from job id to status record
///
/// Cloning is cheap; clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new job; ids are assigned exactly once
    pub async fn create(&self, job: Job) -> Result<(), SocialFetchError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(SocialFetchError::DuplicateJob(job.id));
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    /// All jobs, oldest first
    pub async fn list(&self) -> Vec<Job> {
        let jobs = self.jobs.read().await;
        let mut all: Vec<Job> = jobs.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Mutate one job in place
    pub async fn update<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Job) -> R,
    ) -> Result<R, SocialFetchError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| SocialFetchError::JobNotFound(id.to_string()))?;
        Ok(f(job))
    }

    /// Mutate one job with a fallible operation (state transitions)
    pub async fn try_update<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Job) -> Result<R, SocialFetchError>,
    ) -> Result<R, SocialFetchError> {
        self.update(id, f).await?
    }
}
