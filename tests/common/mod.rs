//! Scripted extraction engine shared by the integration tests.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use socialfetch::downloader::ProgressEvent;
use socialfetch::extractor::{ExtractionEngine, ExtractionOptions, MediaInfo};
use socialfetch::queue::{Job, JobManager, JobState};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// What one attempt does. Attempts past the end of the script succeed.
#[derive(Default, Clone)]
pub struct Step {
    info_error: Option<String>,
    gate: Option<Arc<Notify>>,
    events: Vec<ProgressEvent>,
    files: Vec<String>,
    download_error: Option<String>,
}

impl Step {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn fail(error: &str) -> Self {
        Self {
            download_error: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn fail_info(error: &str) -> Self {
        Self {
            info_error: Some(error.to_string()),
            ..Self::default()
        }
    }

    /// Fail the download after emitting the step's events and files
    pub fn fail_with(mut self, error: &str) -> Self {
        self.download_error = Some(error.to_string());
        self
    }

    /// Hold the download until the gate is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn progress(mut self, downloaded: u64, total: u64) -> Self {
        self.events.push(ProgressEvent::Downloading {
            downloaded_bytes: downloaded,
            total_bytes: Some(total),
            total_bytes_estimate: None,
        });
        self
    }

    pub fn finished(mut self) -> Self {
        self.events.push(ProgressEvent::Finished);
        self
    }

    /// Write a file into the output directory before returning
    pub fn writes(mut self, name: &str) -> Self {
        self.files.push(name.to_string());
        self
    }
}

#[derive(Default)]
pub struct ScriptedEngine {
    script: Mutex<VecDeque<Step>>,
    in_flight: Mutex<HashMap<Option<PathBuf>, Step>>,
    attempt_starts: Mutex<Vec<Instant>>,
    downloads: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            ..Self::default()
        })
    }

    /// Instants at which each extraction (one per attempt) started
    pub fn attempt_starts(&self) -> Vec<Instant> {
        self.attempt_starts.lock().unwrap().clone()
    }

    pub fn extract_calls(&self) -> usize {
        self.attempt_starts.lock().unwrap().len()
    }

    /// URLs passed to `download`, in call order
    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtractionEngine for ScriptedEngine {
    fn id(&self) -> &'static str {
        "scripted"
    }

    async fn extract_info(&self, url: &str, options: &ExtractionOptions) -> Result<MediaInfo> {
        self.attempt_starts.lock().unwrap().push(Instant::now());
        let step = self.script.lock().unwrap().pop_front().unwrap_or_default();

        if let Some(error) = &step.info_error {
            return Err(anyhow!(error.clone()));
        }

        // Keyed by output directory so concurrent jobs keep their own step
        self.in_flight
            .lock()
            .unwrap()
            .insert(options.output_dir().map(PathBuf::from), step);
        Ok(MediaInfo {
            id: "scripted".to_string(),
            title: Some(format!("Clip from {}", url)),
            uploader: Some("someone".to_string()),
            duration: Some(12.5),
            url: url.to_string(),
            ..MediaInfo::default()
        })
    }

    async fn download(
        &self,
        url: &str,
        options: &ExtractionOptions,
        progress: tokio::sync::mpsc::Sender<ProgressEvent>,
    ) -> Result<()> {
        self.downloads.lock().unwrap().push(url.to_string());
        let step = self
            .in_flight
            .lock()
            .unwrap()
            .remove(&options.output_dir().map(PathBuf::from))
            .unwrap_or_default();

        if let Some(gate) = &step.gate {
            gate.notified().await;
        }

        for event in step.events {
            progress.send(event).await?;
        }

        if let Some(dir) = options.output_dir() {
            for name in &step.files {
                std::fs::write(dir.join(name), format!("media for {}", url))?;
            }
        }

        match step.download_error {
            Some(error) => Err(anyhow!(error)),
            None => Ok(()),
        }
    }
}

/// Poll a job until `done` holds, with a generous upper bound on iterations
pub async fn wait_for(manager: &JobManager, id: &str, done: impl Fn(&Job) -> bool) -> Job {
    for _ in 0..2_000 {
        let job = manager.get(id).await.expect("job exists");
        if done(&job) {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never reached the expected state", id);
}

pub async fn wait_terminal(manager: &JobManager, id: &str) -> Job {
    wait_for(manager, id, |job| job.status.is_terminal()).await
}

pub fn is_state(state: JobState) -> impl Fn(&Job) -> bool {
    move |job| job.status == state
}
