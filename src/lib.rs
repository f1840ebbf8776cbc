//! socialfetch library

pub mod downloader;
pub mod extractor;
pub mod platforms;
pub mod queue;
pub mod server;
pub mod utils;

// Re-export main types for easier use
pub use downloader::{ProgressEvent, ProgressReporter};
pub use extractor::{ExtractionEngine, ExtractionOptions, MediaInfo, YtDlpEngine};
pub use platforms::Platform;
pub use queue::{Job, JobManager, JobRequest, JobState, JobStore, ManagerConfig};
pub use utils::{AppSettings, SocialFetchError};
