//! Download progress reporting

pub mod progress;

pub use progress::{ProgressEvent, ProgressReporter};
