//! Execution deadlines for storage calls.
//!
//! Every unit of work and every window scan runs under a maximum execution
//! time. When the deadline passes the in-flight future is dropped, which
//! rolls back any open transaction, and the caller sees a retryable
//! [`ChargeWatchError::Transient`].

use std::future::Future;
use std::time::Duration;

use chargewatch_domain::error::ChargeWatchError;

/// The operation did not finish within its deadline.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{operation} exceeded its deadline of {limit:?}")]
pub struct DeadlineExceeded {
    pub operation: &'static str,
    pub limit: Duration,
}

/// Await `fut`, failing with a transient error once `limit` elapses.
///
/// # Errors
///
/// Returns the future's own error, or [`ChargeWatchError::Transient`]
/// wrapping [`DeadlineExceeded`] on timeout.
pub async fn within<T, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T, ChargeWatchError>
where
    F: Future<Output = Result<T, ChargeWatchError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ChargeWatchError::Transient(Box::new(DeadlineExceeded {
            operation,
            limit,
        }))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_pass_through_result_when_fast_enough() {
        let result = within("probe", Duration::from_secs(1), async { Ok::<_, ChargeWatchError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn should_fail_with_transient_error_when_deadline_passes() {
        let result = within("probe", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<_, ChargeWatchError>(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, ChargeWatchError::Transient(_)));
    }
}
