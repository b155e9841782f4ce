//! Bounded retry for optimistic-lock conflicts.

use std::future::Future;

use oms_domain::{OmsError, CONCURRENT_UPDATE_MESSAGE};

/// Configured retries to attempts. Values <= 0 mean a single attempt.
pub fn attempts_for(max_retries: i32) -> u32 {
    if max_retries <= 0 {
        1
    } else {
        max_retries as u32
    }
}

/// Run `work` until it succeeds, fails with a non-conflict error, or the
/// attempt budget is spent. Each attempt must re-read what it writes.
pub async fn retrying<T, F, Fut>(op: &'static str, max_retries: i32, mut work: F) -> Result<T, OmsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OmsError>>,
{
    let attempts = attempts_for(max_retries);
    let mut attempt = 1;
    loop {
        match work().await {
            Err(e) if e.is_conflict() => {
                if attempt >= attempts {
                    tracing::warn!(op, attempts, "optimistic lock retries exhausted");
                    return Err(OmsError::Conflict(CONCURRENT_UPDATE_MESSAGE.to_string()));
                }
                tracing::debug!(op, attempt, attempts, "optimistic lock conflict, retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn conflict() -> OmsError {
        OmsError::Conflict("stale".into())
    }

    #[tokio::test]
    async fn succeeds_after_transient_conflicts() {
        let calls = Cell::new(0);
        let out = retrying("test", 3, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(conflict())
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn exhaustion_surfaces_concurrent_update() {
        let calls = Cell::new(0);
        let err = retrying("test", 2, || {
            calls.set(calls.get() + 1);
            async { Err::<(), _>(conflict()) }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.get(), 2);
        assert_eq!(err.message(), CONCURRENT_UPDATE_MESSAGE);
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn non_positive_budget_runs_once() {
        for budget in [0, -5] {
            let calls = Cell::new(0);
            let _ = retrying("test", budget, || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(conflict()) }
            })
            .await;
            assert_eq!(calls.get(), 1);
        }
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = Cell::new(0);
        let err = retrying("test", 5, || {
            calls.set(calls.get() + 1);
            async { Err::<(), _>(OmsError::NotFound("gone".into())) }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.get(), 1);
        assert_eq!(err.status_code(), 404);
    }
}
