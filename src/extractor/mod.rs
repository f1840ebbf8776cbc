pub mod models;
pub mod options;
pub mod traits;
pub mod ytdlp;

pub use models::{Format, MediaInfo, MediaSnapshot};
pub use options::ExtractionOptions;
pub use traits::ExtractionEngine;
pub use ytdlp::YtDlpEngine;
