use std::future::Future;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::error::{BookingError, BookingResult};

/// How often a conflicting transaction is re-run before giving up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Sleep before attempt `n + 1` is `backoff * n`
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(20),
        }
    }
}

/// Run a read-decide-commit closure until it commits.
///
/// Each attempt must re-read everything it depends on. Only
/// `StoreError::Conflict` triggers a retry; business rejections and other
/// store failures return immediately. When attempts run out the caller sees
/// `BookingError::Transient`.
pub async fn run_transaction<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut attempt: F,
) -> BookingResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = BookingResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);

    for n in 1..=max_attempts {
        match attempt(n).await {
            Err(e) if e.is_conflict() => {
                debug!("{} attempt {}/{} conflicted: {}", label, n, max_attempts, e);
                if n < max_attempts {
                    tokio::time::sleep(policy.backoff * n).await;
                }
            }
            other => return other,
        }
    }

    warn!("{} gave up after {} conflicting attempts", label, max_attempts);
    Err(BookingError::Transient {
        attempts: max_attempts,
    })
}
