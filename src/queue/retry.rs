//! Retry policy for job attempts
//!
//! Each attempt ends in an [`AttemptOutcome`]. [`RetryPolicy::decide`] maps the
//! outcome and the attempt number to a [`RetryDecision`] without doing any I/O,
//! so the policy can be tested on its own.
//!
//! The delay between attempts is fixed: no exponential growth and no jitter.

use std::path::PathBuf;
use std::time::Duration;

/// Default number of attempts per job, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default fixed delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Engine error fragments that never go away on retry.
const PERMANENT_MARKERS: [&str; 8] = [
    "unsupported url",
    "http error 404",
    "404: not found",
    "video unavailable",
    "private video",
    "this content isn't available",
    "has been removed",
    "does not exist",
];

/// Tagged result of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// The engine's download call returned without error.
    Success { output_dir: PathBuf },
    /// The attempt failed and may succeed when repeated.
    Retryable(String),
    /// The attempt failed in a way repetition cannot fix.
    Fatal(String),
}

impl AttemptOutcome {
    /// Error message of a failed attempt
    pub fn error(&self) -> Option<&str> {
        match self {
            AttemptOutcome::Success { .. } => None,
            AttemptOutcome::Retryable(e) | AttemptOutcome::Fatal(e) => Some(e),
        }
    }
}

/// What the orchestrator does after an attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    Complete { output_dir: PathBuf },
    Retry { delay: Duration, next_attempt: u32 },
    Fail { error: String, exhausted: bool },
}

/// Bounded retry with a fixed delay.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Decide what follows attempt number `attempt` (1-indexed).
    pub fn decide(&self, attempt: u32, outcome: &AttemptOutcome) -> RetryDecision {
        match outcome {
            AttemptOutcome::Success { output_dir } => RetryDecision::Complete {
                output_dir: output_dir.clone(),
            },
            AttemptOutcome::Fatal(error) => RetryDecision::Fail {
                error: error.clone(),
                exhausted: false,
            },
            AttemptOutcome::Retryable(error) if attempt >= self.max_attempts => {
                RetryDecision::Fail {
                    error: error.clone(),
                    exhausted: true,
                }
            }
            AttemptOutcome::Retryable(_) => RetryDecision::Retry {
                delay: self.delay,
                next_attempt: attempt + 1,
            },
        }
    }
}

/// Tag an engine error message.
///
/// With `classify_permanent` off every failure is retryable.
pub fn classify_failure(message: String, classify_permanent: bool) -> AttemptOutcome {
    if classify_permanent && is_permanent(&message) {
        AttemptOutcome::Fatal(message)
    } else {
        AttemptOutcome::Retryable(message)
    }
}

fn is_permanent(message: &str) -> bool {
    let lowered = message.to_lowercase();
    PERMANENT_MARKERS.iter().any(|m| lowered.contains(m))
}
