//! socialfetch - Social media download service
//!
//! HTTP service that downloads TikTok, Instagram, X (Twitter) and Snapchat
//! media through yt-dlp, tracking each download as a background job.

use anyhow::{Context, Result};
use clap::Parser;
use socialfetch::extractor::{ExtractionEngine, YtDlpEngine};
use socialfetch::queue::{JobManager, ManagerConfig};
use socialfetch::server;
use socialfetch::utils::AppSettings;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Social media download service")]
struct Args {
    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(long)]
    port: Option<u16>,

    /// Root directory for downloaded media
    #[arg(long)]
    downloads_dir: Option<PathBuf>,

    /// Path to the yt-dlp binary
    #[arg(long)]
    ytdlp: Option<PathBuf>,
}

impl Args {
    fn apply(self, mut settings: AppSettings) -> AppSettings {
        if let Some(host) = self.host {
            settings.host = host;
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(dir) = self.downloads_dir {
            settings.downloads_root = dir;
        }
        if let Some(path) = self.ytdlp {
            settings.ytdlp_path = Some(path);
        }
        settings
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let settings = AppSettings::load(args.config.as_deref())?;
    let settings = args.apply(settings).validate()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(settings))
}

async fn run(settings: AppSettings) -> Result<()> {
    let engine = match &settings.ytdlp_path {
        Some(path) => YtDlpEngine::with_path(path.clone())?,
        None => YtDlpEngine::new()?,
    };
    check_ytdlp(&engine).await;

    let manager = Arc::new(JobManager::new(
        Arc::new(engine) as Arc<dyn ExtractionEngine>,
        ManagerConfig::from(&settings),
    ));
    manager.prepare_directories().await?;

    info!(
        "Retry policy: {} attempt(s), {}s apart",
        settings.max_attempts, settings.retry_delay_secs
    );
    server::serve(&settings, manager).await
}

async fn check_ytdlp(engine: &YtDlpEngine) {
    match tokio::process::Command::new(engine.ytdlp_path())
        .arg("--version")
        .output()
        .await
    {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout);
            info!(
                "yt-dlp {} found at {}",
                version.trim(),
                engine.ytdlp_path().display()
            );
        }
        _ => warn!(
            "yt-dlp at {} did not answer --version; downloads will fail",
            engine.ytdlp_path().display()
        ),
    }
}
