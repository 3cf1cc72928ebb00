//! Deadline enforcement for outbound calls.

use std::future::Future;
use std::time::Duration;

use common::Context;

use crate::error::{DomainError, Result};

/// Upper bound for a single outbound call.
pub const OUTBOUND_CALL_LIMIT: Duration = Duration::from_secs(10);

/// Runs `fut` within the smaller of [`OUTBOUND_CALL_LIMIT`] and the time
/// left on the request deadline. On expiry the future is dropped and
/// [`DomainError::Timeout`] is returned.
pub async fn bounded<T, F>(ctx: &Context, operation: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let budget = ctx.budget(OUTBOUND_CALL_LIMIT);
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, budget_ms = budget.as_millis() as u64, "outbound call timed out");
            Err(DomainError::Timeout { operation })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let out = bounded(&Context::new(), "noop", async { Ok(7) }).await.unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn test_inner_error_is_preserved() {
        let err = bounded::<(), _>(&Context::new(), "lookup", async {
            Err(DomainError::not_found("book"))
        })
        .await
        .unwrap_err();
        assert!(err.is_not_found("book"));
    }

    #[tokio::test]
    async fn test_expired_deadline_times_out() {
        let ctx = Context::new().with_timeout(Duration::from_millis(10));
        let err = bounded(&ctx, "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(matches!(err, DomainError::Timeout { operation: "slow" }));
    }
}
