//! Generation job lifecycle.
//!
//! Every request sent to the remote question-generation service is tracked
//! by a job record. A job starts `submitted` and ends `fulfilled` when the
//! callback arrives. A job whose deadline passes becomes `timed_out`; one
//! whose submission failed outright becomes `failed`. Both can be resubmitted
//! until the attempt cap is reached.

use std::time::Duration;

pub const JOB_KIND_CHAPTER: &str = "chapter";
pub const JOB_KIND_SIMILAR: &str = "similar";

pub const JOB_STATUS_SUBMITTED: &str = "submitted";
pub const JOB_STATUS_FULFILLED: &str = "fulfilled";
pub const JOB_STATUS_TIMED_OUT: &str = "timed_out";
pub const JOB_STATUS_FAILED: &str = "failed";

/// Number of questions requested when generating a follow-up for a missed answer.
pub const SIMILAR_QUESTION_COUNT: i32 = 1;

/// Default number of questions requested for a new chapter.
pub const DEFAULT_CHAPTER_QUESTION_COUNT: i32 = 10;

/// Upper bound on questions requested for one chapter.
pub const MAX_CHAPTER_QUESTION_COUNT: i32 = 100;

/// Timeout and retry limits for generation jobs.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// How long a submitted job may wait for its callback.
    pub timeout: Duration,
    /// Total submissions allowed, including the first.
    pub max_attempts: i32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(900),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// Whether a job in `status` after `attempts` submissions may be resubmitted.
    pub fn can_retry(&self, status: &str, attempts: i32) -> bool {
        matches!(status, JOB_STATUS_TIMED_OUT | JOB_STATUS_FAILED) && attempts < self.max_attempts
    }
}
