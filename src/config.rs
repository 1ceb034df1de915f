//! Engine configuration: retry schedule, timeouts, concurrency, and
//! resolution policy.
//!
//! Plain structs with `Default` and `with_*` builders; nothing here is
//! read from the environment.

use std::time::Duration;

use regex::Regex;

use crate::resolver::{default_key_pattern, CreationPolicy};
use crate::types::issue::IssueTemplate;

/// Backoff schedule for transient failures.
///
/// Delays grow exponentially (`base_delay * factor^(attempt-1)`) with
/// full jitter: the actual wait is uniform over `0..=computed`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use issuesync::config::RetryConfig;
///
/// let retry = RetryConfig::default();
/// assert_eq!(retry.base_delay, Duration::from_millis(200));
/// assert_eq!(retry.factor, 2);
/// assert_eq!(retry.max_attempts, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delay before the first retry (pre-jitter).
    pub base_delay: Duration,

    /// Exponential growth factor between attempts.
    pub factor: u32,

    /// Mutation attempts before surfacing `Failed`.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(200),
            factor: 2,
            max_attempts: 5,
        }
    }
}

impl RetryConfig {
    /// Sets the pre-jitter delay before the first retry.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sets the exponential growth factor.
    pub fn with_factor(mut self, factor: u32) -> Self {
        self.factor = factor;
        self
    }

    /// Sets the attempt cap.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Engine-wide configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// What to do when the target issue does not exist.
    pub creation_policy: CreationPolicy,

    /// Template used when `creation_policy` is `CreateIfMissing`.
    pub template: Option<IssueTemplate>,

    /// Backoff schedule for transient failures.
    pub retry: RetryConfig,

    /// Timeout applied to every individual client call; elapse is
    /// classified as transient.
    pub call_timeout: Duration,

    /// Concurrent syncs across distinct correlation keys. Same-key
    /// syncs are always serialized regardless of this value.
    pub max_concurrent_syncs: usize,

    /// Pattern classifying a correlation key as a direct issue key.
    pub key_pattern: Regex,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            creation_policy: CreationPolicy::default(),
            template: None,
            retry: RetryConfig::default(),
            call_timeout: Duration::from_secs(10),
            max_concurrent_syncs: 4,
            key_pattern: default_key_pattern(),
        }
    }
}

impl SyncConfig {
    /// Sets the missing-issue policy.
    pub fn with_creation_policy(mut self, policy: CreationPolicy) -> Self {
        self.creation_policy = policy;
        self
    }

    /// Sets the creation template.
    pub fn with_template(mut self, template: IssueTemplate) -> Self {
        self.template = Some(template);
        self
    }

    /// Sets the retry schedule.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Sets the cross-key concurrency cap.
    pub fn with_max_concurrent_syncs(mut self, max: usize) -> Self {
        self.max_concurrent_syncs = max.max(1);
        self
    }

    /// Sets the direct-key classification pattern.
    pub fn with_key_pattern(mut self, pattern: Regex) -> Self {
        self.key_pattern = pattern;
        self
    }
}
