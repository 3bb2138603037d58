use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::domain::ports::clock::Clock;
use crate::domain::ports::listing_source::SourceError;

/// Bounded exponential backoff for transient source errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Longest the whole retry loop can take when every attempt runs into
    /// `attempt_timeout`: all attempts plus every backoff between them.
    pub fn worst_case(&self, attempt_timeout: Duration) -> Duration {
        let backoff = (0..self.max_retries).fold(Duration::ZERO, |acc, retry| acc.saturating_add(self.delay_for(retry)));
        attempt_timeout
            .saturating_mul(self.max_retries.saturating_add(1))
            .saturating_add(backoff)
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// retry budget is spent. The final error is returned as-is.
    pub async fn run<T, F, Fut>(&self, clock: &dyn Clock, mut op: F) -> Result<T, SourceError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Transient fetch failure, backing off: {e}"
                    );
                    clock.sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClock {
        sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Clock for RecordingClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }

        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for(40), Duration::from_millis(500));
    }

    #[test]
    fn test_worst_case_covers_attempts_and_backoff() {
        let policy = RetryPolicy::default();
        // 4 attempts of 30s plus 0.5s + 1s + 2s of backoff.
        assert_eq!(policy.worst_case(Duration::from_secs(30)), Duration::from_millis(123_500));

        let no_retries = RetryPolicy {
            max_retries: 0,
            ..Default::default()
        };
        assert_eq!(no_retries.worst_case(Duration::from_secs(5)), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let clock = RecordingClock::default();
        let policy = RetryPolicy::default();
        let out = policy
            .run(&clock, |attempt| async move {
                if attempt < 2 {
                    Err(SourceError::RateLimited("slow down".into()))
                } else {
                    Ok(attempt)
                }
            })
            .await
            .unwrap();
        assert_eq!(out, 2);
        assert_eq!(
            *clock.sleeps.lock().unwrap(),
            vec![Duration::from_millis(500), Duration::from_millis(1000)]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let clock = RecordingClock::default();
        let policy = RetryPolicy {
            max_retries: 2,
            ..Default::default()
        };
        let err = policy
            .run(&clock, |_| async { Err::<(), _>(SourceError::Network("reset".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Network(_)));
        assert_eq!(clock.sleeps.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let clock = RecordingClock::default();
        let err = RetryPolicy::default()
            .run(&clock, |_| async { Err::<(), _>(SourceError::Parse("bad json".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
        assert!(clock.sleeps.lock().unwrap().is_empty());
    }
}
