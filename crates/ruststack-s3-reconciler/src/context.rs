//! Caller-driven cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Cancellation scope of one reconciliation call.
///
/// Clones share the cancel flag, so a caller can keep one clone and cancel
/// the run from another task. The engine only checks the scope between retry
/// attempts; a request already in flight always completes.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl RunContext {
    /// A scope without deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(deadline),
        }
    }

    /// A scope that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Cancel the run.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether the run was cancelled or its deadline has passed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Time left before the deadline, if any.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_share_cancellation_between_clones() {
        let cx = RunContext::new();
        let other = cx.clone();
        assert!(!cx.is_done());
        other.cancel();
        assert!(cx.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_expire_after_timeout() {
        let cx = RunContext::with_timeout(Duration::from_secs(5));
        assert!(!cx.is_done());
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(cx.is_done());
        assert_eq!(cx.remaining(), Some(Duration::ZERO));
    }
}
