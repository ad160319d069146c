//! Retry loop: run a closure until success or policy says stop.

use super::policy::{RetryDecision, RetryPolicy};

/// Runs a closure until it succeeds or the retry policy says to stop.
/// On failure, calls `on_retry(attempt, &error, delay)`, sleeps for the delay
/// then tries again. The closure receives the 1-based attempt number.
pub fn run_with_retry<T, E, F, R>(policy: &RetryPolicy, mut f: F, mut on_retry: R) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    R: FnMut(u32, &E, std::time::Duration),
{
    let mut attempt = 1u32;
    loop {
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => match policy.decide(attempt) {
                RetryDecision::NoRetry => return Err(e),
                RetryDecision::RetryAfter(d) => {
                    on_retry(attempt, &e, d);
                    std::thread::sleep(d);
                    attempt += 1;
                }
            },
        }
    }
}
