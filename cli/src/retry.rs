use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{Classify, ErrorKind};

/// Total attempts, first one included.
pub const RETRIES: u32 = 3;

/// Constant pause between attempts. Not exponential.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(750);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Decide what to do after `attempt` (1-based) failed with `kind`.
pub fn policy(attempt: u32, kind: ErrorKind) -> RetryDecision {
    match kind {
        ErrorKind::Network if attempt < RETRIES => RetryDecision::RetryAfter(RETRY_BACKOFF),
        _ => RetryDecision::GiveUp,
    }
}

/// Run `op` until it succeeds or [`policy`] gives up, returning the last error.
pub async fn retry<T, E, F, Fut>(mut op: F) -> Result<T, E>
where
    E: Classify + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => match policy(attempt, err.kind()) {
                RetryDecision::RetryAfter(delay) => {
                    log::warn!("Attempt {}/{} failed, retrying: {}", attempt, RETRIES, err);
                    sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::GiveUp => return Err(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fmt;
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    struct TestError(ErrorKind);

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }

    impl Classify for TestError {
        fn kind(&self) -> ErrorKind {
            self.0
        }
    }

    #[test]
    fn policy_retries_network_errors_until_the_budget_is_spent() {
        assert_eq!(policy(1, ErrorKind::Network), RetryDecision::RetryAfter(RETRY_BACKOFF));
        assert_eq!(policy(2, ErrorKind::Network), RetryDecision::RetryAfter(RETRY_BACKOFF));
        assert_eq!(policy(3, ErrorKind::Network), RetryDecision::GiveUp);
    }

    #[test]
    fn policy_never_retries_other_kinds() {
        assert_eq!(policy(1, ErrorKind::Shape), RetryDecision::GiveUp);
        assert_eq!(policy(1, ErrorKind::Status), RetryDecision::GiveUp);
    }

    #[tokio::test(start_paused = true)]
    async fn fails_twice_then_succeeds_on_third_attempt() {
        let calls = Cell::new(0);
        let started = Instant::now();
        let result = retry(|| {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(TestError(ErrorKind::Network))
                } else {
                    Ok("payload")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("payload"));
        assert_eq!(calls.get(), 3);
        let waited = started.elapsed();
        assert!(waited >= RETRY_BACKOFF * 2 && waited < RETRY_BACKOFF * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_operation_stops_after_three_attempts() {
        let calls = Cell::new(0);
        let started = Instant::now();
        let result: Result<(), _> = retry(|| {
            calls.set(calls.get() + 1);
            async { Err(TestError(ErrorKind::Network)) }
        })
        .await;

        assert_eq!(result, Err(TestError(ErrorKind::Network)));
        assert_eq!(calls.get(), RETRIES);
        // Two pauses between three attempts, none after the last one.
        let waited = started.elapsed();
        assert!(waited >= RETRY_BACKOFF * 2 && waited < RETRY_BACKOFF * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shape_errors_propagate_without_retry() {
        let calls = Cell::new(0);
        let started = Instant::now();
        let result: Result<(), _> = retry(|| {
            calls.set(calls.get() + 1);
            async { Err(TestError(ErrorKind::Shape)) }
        })
        .await;

        assert_eq!(result, Err(TestError(ErrorKind::Shape)));
        assert_eq!(calls.get(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
