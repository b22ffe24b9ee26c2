//! Timeout enforcement.
//!
//! # Responsibilities
//! - Race a wrapped operation against its deadline
//! - Tell the operation when it has lost the race
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities (virtual time in paused tests)
//! - The operation receives a `CancellationToken`; it is cancelled when the
//!   deadline wins and the operation future is dropped at that point
//! - Work the operation spawned elsewhere must watch the token itself; the
//!   guard cannot reach it
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::resilience::errors::OperationError;

/// Bounds an operation by a fixed deadline.
#[derive(Debug, Clone)]
pub struct TimeoutGuard {
    duration: Duration,
}

impl TimeoutGuard {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Run `op`, returning whichever of its result or the deadline comes first.
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, OperationError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, OperationError>>,
    {
        let token = CancellationToken::new();
        let operation = op(token.clone());

        match tokio::time::timeout(self.duration, operation).await {
            Ok(result) => result,
            Err(_) => {
                token.cancel();
                tracing::debug!(timeout_ms = self.duration.as_millis() as u64, "Operation deadline elapsed");
                Err(OperationError::Timeout(self.duration))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test(start_paused = true)]
    async fn test_fast_operation_wins() {
        let guard = TimeoutGuard::new(Duration::from_secs(30));
        let result = guard.run(|_| async { Ok::<_, OperationError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_wins_and_cancels_token() {
        let guard = TimeoutGuard::new(Duration::from_millis(100));
        let (cancelled_tx, cancelled_rx) = oneshot::channel();

        let result: Result<(), _> = guard
            .run(|token| async move {
                // Detached work that honours the token.
                tokio::spawn(async move {
                    token.cancelled().await;
                    let _ = cancelled_tx.send(());
                });
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;

        assert_eq!(result, Err(OperationError::Timeout(Duration::from_millis(100))));
        assert!(cancelled_rx.await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_error_passes_through() {
        let guard = TimeoutGuard::new(Duration::from_secs(1));
        let result: Result<(), _> = guard
            .run(|_| async { Err(OperationError::Critical("fatal".into())) })
            .await;
        assert_eq!(result, Err(OperationError::Critical("fatal".into())));
    }
}
