use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::core::config::RetryConfig;
use crate::core::error::FetchError;

// ---------------------------------------------------------------------------
// Retry chain: a cooldown wrapper around an exponential-backoff loop.
// Composed as plain async functions rather than a handler hierarchy.
// ---------------------------------------------------------------------------

/// Default chain: Cooldown -> ExponentialBackoff.
///
/// The backoff loop retries retryable errors up to `max_retries` times,
/// waiting `max(min(delay, max_delay), error.retry_after)` between attempts
/// and multiplying `delay` by `backoff_factor`. If the whole loop exhausts,
/// the cooldown wrapper sleeps once and runs the loop a second time. It does
/// not loop further.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            initial_delay: cfg.initial_delay,
            max_delay: cfg.max_delay,
            backoff_factor: cfg.backoff_factor,
            cooldown: cfg.cooldown,
        }
    }

    /// A policy that never sleeps. Used where the caller provides its own
    /// pacing (and in tests).
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_factor: 1.0,
            cooldown: Duration::ZERO,
        }
    }

    /// Run `op` through the full chain.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        match self.backoff(&mut op).await {
            Err(e) if e.retry_after().is_some() => {
                info!("Cooldown period: {:.1}s", self.cooldown.as_secs_f64());
                tokio::time::sleep(self.cooldown).await;
                self.backoff(&mut op).await
            }
            other => other,
        }
    }

    async fn backoff<T, F, Fut>(&self, op: &mut F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let Some(hint) = err.retry_after() else {
                warn!("Non-retryable error: {}", err);
                return Err(err);
            };

            if attempt > self.max_retries {
                warn!("All {} attempts failed", attempt);
                return Err(err);
            }

            let wait = delay.min(self.max_delay).max(hint);
            warn!(
                "Attempt {}/{} failed: {}. Retrying after {:.1}s",
                attempt,
                self.max_retries + 1,
                err,
                wait.as_secs_f64()
            );
            tokio::time::sleep(wait).await;
            delay = delay.mul_f64(self.backoff_factor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn retryable() -> FetchError {
        FetchError::Transport("connection reset".into())
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_without_retry() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let out = policy
            .run(move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, FetchError>(42)
                }
            })
            .await;
        assert_eq!(out.ok(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let out = policy
            .run(move || {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(retryable())
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;
        assert_eq!(out.ok(), Some("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_grants_one_extra_round() {
        // backoff round = max_retries + 1 attempts; cooldown doubles it.
        let policy = RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            backoff_factor: 2.0,
            cooldown: Duration::from_millis(10),
        };
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let out: Result<(), _> = policy
            .run(move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(retryable())
                }
            })
            .await;
        assert!(out.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_fails_fast() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let out: Result<(), _> = policy
            .run(move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(FetchError::InvalidUrl {
                        url: "x".into(),
                        reason: "bad".into(),
                    })
                }
            })
            .await;
        assert!(out.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn honors_retry_after_over_small_delay() {
        // 5xx suggests 10s; initial delay is 1ms, so the wait must be >= 10s.
        let policy = RetryPolicy {
            max_retries: 1,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
            cooldown: Duration::ZERO,
        };
        let start = tokio::time::Instant::now();
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let _ = policy
            .run(move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(FetchError::Status { status: 503 })
                }
            })
            .await;
        assert!(start.elapsed() >= Duration::from_secs(10));
    }
}
