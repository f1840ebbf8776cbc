use crate::downloader::ProgressEvent;
use crate::extractor::models::MediaInfo;
use crate::extractor::options::ExtractionOptions;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Seam to the external content-extraction engine
///
/// The engine is a black box: given a URL and an options bag it either reports
/// metadata, downloads into the configured output directory, or fails.
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Returns a unique identifier for this engine (e.g., "yt-dlp")
    fn id(&self) -> &'static str;

    /// Extracts metadata only, without transferring the media
    async fn extract_info(&self, url: &str, options: &ExtractionOptions) -> Result<MediaInfo>;

    /// Downloads the media, pushing progress events into `progress`
    ///
    /// The sender is dropped when the download returns, which closes the channel.
    async fn download(
        &self,
        url: &str,
        options: &ExtractionOptions,
        progress: mpsc::Sender<ProgressEvent>,
    ) -> Result<()>;
}
