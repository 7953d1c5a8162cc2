//! Bounded retry with a fixed back-off schedule.
//!
//! Only the catalog endpoint is wrapped in a [`RetryPolicy`]; the other
//! datasets are fetched once. Authentication failures are never retried
//! here, they belong to the 401-refresh path in [`crate::datasets`].

use std::future::Future;
use std::time::Duration;

use crate::error::SupplierError;

/// Attempt count plus the delay slept after each failed attempt.
///
/// When there are more attempts than delays, the last delay repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delays: Vec<Duration>,
}

impl RetryPolicy {
    /// Builds a policy; `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(max_attempts: u32, delays: Vec<Duration>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delays,
        }
    }

    /// Builds a policy from millisecond delays as configured.
    #[must_use]
    pub fn from_millis(max_attempts: u32, delays_ms: &[u64]) -> Self {
        Self::new(
            max_attempts,
            delays_ms.iter().copied().map(Duration::from_millis).collect(),
        )
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay slept after failed attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let idx = usize::try_from(attempt.saturating_sub(1)).unwrap_or(usize::MAX);
        self.delays
            .get(idx)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Runs `operation` until it succeeds, fails with a non-transient error,
    /// or the attempt budget is spent. The last error is returned.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt.
    pub async fn run<T, F, Fut>(&self, endpoint: &str, mut operation: F) -> Result<T, SupplierError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SupplierError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !is_transient(&err) || attempt >= self.max_attempts {
                        return Err(err);
                    }
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        endpoint,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient upstream error, retrying after back-off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Network failures, unexpected statuses and unparseable bodies are retried.
/// Everything auth-related falls through untouched.
pub(crate) fn is_transient(err: &SupplierError) -> bool {
    matches!(
        err,
        SupplierError::Network { .. }
            | SupplierError::UpstreamStatus { .. }
            | SupplierError::DataFormat { .. }
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn upstream_500() -> SupplierError {
        SupplierError::UpstreamStatus {
            endpoint: "getCatalogo".to_owned(),
            status: 500,
            snippet: "oops".to_owned(),
        }
    }

    #[test]
    fn last_delay_repeats() {
        let policy = RetryPolicy::from_millis(5, &[500, 1000, 2000]);
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(4), Duration::from_millis(2000));
    }

    #[test]
    fn empty_schedule_means_no_delay() {
        assert_eq!(RetryPolicy::new(3, Vec::new()).delay_after(2), Duration::ZERO);
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Vec::new()).max_attempts(), 1);
    }

    #[test]
    fn auth_errors_are_not_transient() {
        assert!(!is_transient(&SupplierError::Unauthorized {
            endpoint: "getCatalogo".to_owned()
        }));
        assert!(!is_transient(&SupplierError::TokenMissing));
        assert!(is_transient(&upstream_500()));
        assert!(is_transient(&SupplierError::data_format(
            "getCatalogo",
            "not JSON",
            "<html>"
        )));
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = RetryPolicy::from_millis(3, &[0])
            .run("getCatalogo", || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok::<u32, SupplierError>(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = RetryPolicy::from_millis(3, &[0])
            .run("getCatalogo", || {
                let c = Arc::clone(&c);
                async move {
                    let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                    if attempt < 3 {
                        Err(upstream_500())
                    } else {
                        Ok(99)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = RetryPolicy::from_millis(3, &[0])
            .run("getCatalogo", || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(upstream_500())
                }
            })
            .await;
        assert!(matches!(
            result,
            Err(SupplierError::UpstreamStatus { status: 500, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_unauthorized() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = RetryPolicy::from_millis(3, &[0])
            .run("getCatalogo", || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(SupplierError::Unauthorized {
                        endpoint: "getCatalogo".to_owned(),
                    })
                }
            })
            .await;
        assert!(matches!(result, Err(SupplierError::Unauthorized { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1, "401 must not be retried");
    }
}
