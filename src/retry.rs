//! Bounded exponential backoff with jitter.
//!
//! Used for page fetches and generative calls. Publishing never goes through
//! here: destination endpoints are not idempotent, so a retried post could
//! appear twice.
//!
//! The delay between retries follows:
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use rand::{Rng, rng};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    /// Retries after the first attempt. Zero means a single attempt.
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Backoff {
    /// Exponential backoff capped at 30 seconds.
    ///
    /// # Arguments
    ///
    /// * `max_retries` - Retries after the first attempt
    /// * `base_delay` - Delay before the first retry; doubled for each one after
    pub fn new(max_retries: usize, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (1-based), without jitter.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds or retries are exhausted. `what` labels the
    /// operation in logs.
    pub async fn run<T, E, F, Fut>(&self, what: &str, op: F) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_when(what, op, |_| true).await
    }

    /// Like [`Backoff::run`], but errors for which `retryable` is false are
    /// returned immediately.
    pub async fn run_when<T, E, F, Fut, R>(&self, what: &str, mut op: F, retryable: R) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
    {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    attempt += 1;
                    if !retryable(&e) {
                        return Err(e);
                    }
                    if attempt > self.max_retries {
                        if self.max_retries > 0 {
                            error!(
                                what,
                                attempt,
                                max = self.max_retries,
                                elapsed_ms_total = total_t0.elapsed().as_millis(),
                                error = %e,
                                "exhausted retries"
                            );
                        }
                        return Err(e);
                    }

                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = self.delay_for(attempt) + Duration::from_millis(jitter_ms);
                    warn!(
                        what,
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
