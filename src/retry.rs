use std::fmt::Display;
use std::time::Duration;

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

/// Run `op` until it succeeds or `policy.attempts` runs out, sleeping the
/// current thread between attempts. Returns the last error on exhaustion.
pub fn retry<T, E, F>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Result<T, E>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => {
                tracing::error!("Loading {} failed after {} attempts: {}", what, attempts, e);
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    "Attempt {} to load {} failed, retrying in {:?}: {}",
                    attempt,
                    what,
                    policy.delay,
                    e
                );
                std::thread::sleep(policy.delay);
                attempt += 1;
            }
        }
    }
}
