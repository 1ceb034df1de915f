//! Exponential backoff with full jitter, cancellable between intervals.

use std::time::Duration;

use rand::RngExt;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::error::SyncError;

/// Computes the jittered delay before retrying after `attempt` failures.
///
/// The pre-jitter delay is `base_delay * factor^(attempt-1)`; full
/// jitter draws uniformly from `0..=pre_jitter`. The exponent is capped
/// so pathological attempt counts cannot overflow the arithmetic.
pub(crate) fn delay_for(retry: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let ceiling = retry
        .base_delay
        .saturating_mul(retry.factor.saturating_pow(exponent));
    if ceiling.is_zero() {
        return ceiling;
    }
    let ceiling_ms = u64::try_from(ceiling.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rand::rng().random_range(0..=ceiling_ms))
}

/// Waits out the backoff interval for `attempt`, or returns early when
/// the token is cancelled.
///
/// # Errors
///
/// [`SyncError::Cancelled`] when cancellation wins the race. Only the
/// wait is cancellable; an in-flight write is always allowed to
/// complete before the engine reaches this point again.
pub(crate) async fn wait(
    retry: &RetryConfig,
    attempt: u32,
    cancel: &CancellationToken,
) -> Result<(), SyncError> {
    let delay = delay_for(retry, attempt);
    tokio::select! {
        () = tokio::time::sleep(delay) => Ok(()),
        () = cancel.cancelled() => Err(SyncError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_bounded_by_schedule() {
        let retry = RetryConfig::default();
        for attempt in 1..=5 {
            let ceiling = retry.base_delay * retry.factor.pow(attempt - 1);
            for _ in 0..50 {
                assert!(delay_for(&retry, attempt) <= ceiling);
            }
        }
    }

    #[test]
    fn zero_base_delay_yields_zero() {
        let retry = RetryConfig::default().with_base_delay(Duration::ZERO);
        assert_eq!(delay_for(&retry, 3), Duration::ZERO);
    }

    #[tokio::test]
    async fn cancelled_wait_returns_cancelled() {
        let retry = RetryConfig::default().with_base_delay(Duration::from_secs(60));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = wait(&retry, 1, &cancel).await.unwrap_err();
        assert!(matches!(err, SyncError::Cancelled));
    }

    #[tokio::test]
    async fn uncancelled_wait_completes() {
        let retry = RetryConfig::default().with_base_delay(Duration::from_millis(1));
        let cancel = CancellationToken::new();
        assert!(wait(&retry, 1, &cancel).await.is_ok());
    }
}
