use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total runs = 1 + retries).
    pub retries: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: usize, delay: Duration) -> Self {
        Self { retries, delay }
    }

    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(500))
    }
}

/// Retries an async operation while `is_transient` says the failure is worth
/// another attempt.
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `policy`: Retry budget and delay
/// - `is_transient`: Classifies an error; permanent errors return immediately
///
/// # Returns
/// Either the successful result or the last error
pub async fn with_retry<F, Fut, T, E>(
    mut operation: F,
    policy: &RetryPolicy,
    is_transient: impl Fn(&E) -> bool,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if !is_transient(&err) || attempt > policy.retries {
                    return Err(err);
                }
                warn!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt,
                    policy.retries + 1,
                    err
                );
                attempt += 1;
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
