pub mod job;
pub mod manager;
pub mod retry;
pub mod store;

pub use job::{Job, JobState};
pub use manager::{JobManager, JobRequest, ManagerConfig};
pub use retry::{AttemptOutcome, RetryDecision, RetryPolicy};
pub use store::JobStore;
