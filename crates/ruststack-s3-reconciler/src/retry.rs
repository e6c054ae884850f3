//! Deadline-bounded retries.
//!
//! A [`RetryPolicy`] re-runs an operation while a call-site classifier says
//! its error is worth retrying. When the deadline passes the policy makes one
//! last attempt and returns whatever that attempt produced, so a slow success
//! is never reported as a timeout.
//!
//! ```text
//! attempt ──ok──────────────────────────────▶ Ok
//!    │
//!    err ──not retryable / cancelled────────▶ Err(last)
//!    │
//!    ├── before deadline: sleep(backoff) ───▶ attempt
//!    └── deadline passed ───▶ final attempt ▶ its result
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use ruststack_s3_model::{S3Error, S3ErrorCode};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::context::RunContext;

const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Retry loop with a deadline and exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    timeout: Duration,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// A policy retrying for at most `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// Override the backoff bounds.
    #[must_use]
    pub fn with_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_delay = initial;
        self.max_delay = max.max(initial);
        self
    }

    /// Total retry window.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `operation` until it succeeds, fails with an error `is_retryable`
    /// rejects, the context is done, or the deadline passes.
    pub async fn run<T, E, F, Fut, C>(
        &self,
        cx: &RunContext,
        label: &str,
        is_retryable: C,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> bool,
        E: fmt::Display,
    {
        let deadline = Instant::now() + self.timeout;
        let mut delay = self.initial_delay;
        let mut attempt: u32 = 1;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !is_retryable(&err) {
                return Err(err);
            }
            if cx.is_done() {
                warn!(operation = label, attempt, error = %err, "run cancelled, giving up retries");
                return Err(err);
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let mut pause = delay.min(deadline - now);
            if let Some(left) = cx.remaining() {
                pause = pause.min(left);
            }
            debug!(
                operation = label,
                attempt,
                error = %err,
                delay_ms = pause.as_millis(),
                "retrying"
            );
            tokio::time::sleep(pause).await;

            delay = (delay * 2).min(self.max_delay);
            attempt += 1;
        }

        warn!(operation = label, attempt, "retry deadline elapsed, making final attempt");
        operation().await
    }
}

// ---------------------------------------------------------------------------
// Classifiers
// ---------------------------------------------------------------------------

/// A bucket created moments ago is not yet visible to this endpoint.
#[must_use]
pub fn is_not_yet_visible(err: &S3Error) -> bool {
    err.is(S3ErrorCode::NoSuchBucket)
}

/// A conflicting operation on the same bucket is still in progress.
#[must_use]
pub fn is_operation_aborted(err: &S3Error) -> bool {
    err.is(S3ErrorCode::OperationAborted)
}

/// Versioning was enabled but the replication endpoint has not seen it yet.
#[must_use]
pub fn is_versioning_propagating(err: &S3Error) -> bool {
    err.matches(
        S3ErrorCode::InvalidRequest,
        "Versioning must be 'Enabled' on the bucket",
    )
}

/// Default classifier for facet writes.
#[must_use]
pub fn is_propagation_lag(err: &S3Error) -> bool {
    is_not_yet_visible(err) || is_operation_aborted(err)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use ruststack_s3_model::s3_error;

    use super::*;

    fn policy(secs: u64) -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(secs))
            .with_delays(Duration::from_millis(100), Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_return_first_success() {
        let calls = &AtomicU32::new(0);
        let result: Result<u32, S3Error> = policy(60)
            .run(&RunContext::new(), "op", is_propagation_lag, move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(s3_error!(OperationAborted))
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_not_retry_permanent_errors() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), S3Error> = policy(60)
            .run(&RunContext::new(), "op", is_propagation_lag, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(s3_error!(AccessDenied))
            })
            .await;
        assert_eq!(result.unwrap_err().code, S3ErrorCode::AccessDenied);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_make_final_attempt_after_deadline() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();
        let seen = Arc::clone(&calls);
        // Succeeds only once the window has closed.
        let result: Result<&str, S3Error> = policy(5)
            .run(&RunContext::new(), "op", is_propagation_lag, move || {
                let seen = Arc::clone(&seen);
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    if Instant::now() >= started + Duration::from_secs(5) {
                        Ok("late")
                    } else {
                        Err(s3_error!(NoSuchBucket))
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "late");
        assert!(calls.load(Ordering::SeqCst) > 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_return_final_attempt_error() {
        let result: Result<(), S3Error> = policy(2)
            .run(&RunContext::new(), "op", is_propagation_lag, || async {
                Err(s3_error!(OperationAborted, "still busy"))
            })
            .await;
        assert_eq!(result.unwrap_err().message, "still busy");
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_stop_at_iteration_boundary_when_cancelled() {
        let cx = RunContext::new();
        let calls = AtomicU32::new(0);
        let result: Result<(), S3Error> = policy(60)
            .run(&cx, "op", is_propagation_lag, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 1 {
                    cx.cancel();
                }
                async { Err(s3_error!(OperationAborted)) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_should_classify_versioning_propagation() {
        assert!(is_versioning_propagating(&S3Error::invalid_request(
            "Versioning must be 'Enabled' on the bucket to apply a replication configuration"
        )));
        assert!(!is_versioning_propagating(&s3_error!(InvalidRequest)));
        assert!(is_propagation_lag(&s3_error!(NoSuchBucket)));
        assert!(!is_propagation_lag(&s3_error!(MalformedPolicy)));
    }
}
