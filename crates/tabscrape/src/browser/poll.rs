use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};

use super::driver::BrowserError;

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Timed out after {waited:?} waiting for {what}")]
    TimedOut { what: String, waited: Duration },
    #[error(transparent)]
    Check(#[from] BrowserError),
}

/// Evaluates `check` until it yields a value, sleeping `interval` between
/// attempts. With `timeout` set to `None` this waits forever.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    interval: Duration,
    timeout: Option<Duration>,
    mut check: F,
) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, BrowserError>>,
{
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        if let Some(value) = check().await? {
            log::debug!("{} ready after {} attempt(s)", what, attempts);
            return Ok(value);
        }

        let waited = started.elapsed();
        if let Some(limit) = timeout
            && waited >= limit
        {
            return Err(PollError::TimedOut {
                what: what.to_string(),
                waited,
            });
        }

        log::trace!("{} not ready (attempt {}), sleeping {:?}", what, attempts, interval);
        sleep(interval).await;
    }
}
