//! Three-state circuit breaker guarding one external dependency.
//!
//! All state lives behind a single mutex per breaker. The lock is only held
//! for synchronous bookkeeping and never across an `.await`, so a caller that
//! abandons its future can never leave the breaker mid-transition.
//!
//! In `HalfOpen` exactly one probe is admitted at a time via a lease. The
//! lease is released when the probe settles, when its future is dropped, or
//! when it expires, so a stuck prober cannot wedge the breaker.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::ports::clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation, calls pass through
    Closed,
    /// Failure threshold reached, calls short-circuited
    Open,
    /// Recovery window, a single probe is allowed through
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures that trip the circuit
    pub failure_threshold: u32,
    /// Time spent `Open` before a probe is allowed
    pub recovery_timeout: Duration,
    /// How long a single probe may hold the half-open lease. Must outlast
    /// the slowest guarded call, retries included.
    pub probe_lease: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            probe_lease: Duration::from_secs(130),
        }
    }
}

/// Error from [`CircuitBreaker::execute`].
#[derive(Debug)]
pub enum BreakerError<E> {
    /// Dependency is known-bad; the call was not attempted.
    Open { retry_after: Duration },
    /// The guarded call ran and failed.
    Call(E),
}

impl<E: std::fmt::Display> std::fmt::Display for BreakerError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerError::Open { retry_after } => {
                write!(f, "circuit open, retry after {}s", retry_after.as_secs())
            }
            BreakerError::Call(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for BreakerError<E> {}

/// Point-in-time view for dashboards and cache stats.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub dependency: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,
    pub probe_in_flight: bool,
    pub total_trips: u64,
}

#[derive(Debug)]
struct ProbeLease {
    token: u64,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<DateTime<Utc>>,
    opened_at: Option<DateTime<Utc>>,
    probe: Option<ProbeLease>,
    next_token: u64,
    total_trips: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Pass,
    Probe(u64),
}

pub struct CircuitBreaker {
    dependency: String,
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(dependency: impl Into<String>, config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            dependency: dependency.into(),
            config,
            clock,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure_at: None,
                opened_at: None,
                probe: None,
                next_token: 0,
                total_trips: 0,
            }),
        }
    }

    pub fn dependency(&self) -> &str {
        &self.dependency
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Run `call` through the breaker.
    ///
    /// Returns `BreakerError::Open` without invoking `call` while the circuit is
    /// open (or while another caller holds the half-open probe). Otherwise the
    /// call runs and its outcome updates the breaker before being returned.
    pub async fn execute<F, Fut, T, E>(&self, call: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let admission = self.admit().map_err(|retry_after| BreakerError::Open { retry_after })?;
        let mut guard = AdmissionGuard {
            breaker: self,
            admission,
            settled: false,
        };

        let outcome = call().await;
        match &outcome {
            Ok(_) => guard.settle(true),
            Err(_) => guard.settle(false),
        }
        outcome.map_err(BreakerError::Call)
    }

    /// Administrative reset back to `Closed`.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.probe = None;
        warn!(dependency = %self.dependency, "Circuit breaker reset by operator");
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = self.clock.now();
        let inner = self.lock();
        BreakerSnapshot {
            dependency: self.dependency.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            failure_threshold: self.config.failure_threshold,
            recovery_timeout_secs: self.config.recovery_timeout.as_secs(),
            last_failure_at: inner.last_failure_at,
            opened_at: inner.opened_at,
            probe_in_flight: inner.probe.as_ref().is_some_and(|p| p.expires_at > now),
            total_trips: inner.total_trips,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        // A panic while holding the lock leaves plain data behind; keep serving.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn admit(&self) -> Result<Admission, Duration> {
        let now = self.clock.now();
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(Admission::Pass),
            CircuitState::Open => {
                let opened_at = inner.opened_at.unwrap_or(now);
                let elapsed = (now - opened_at).to_std().unwrap_or(Duration::ZERO);
                if elapsed >= self.config.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    info!(dependency = %self.dependency, "Circuit breaker entering half-open");
                    Ok(self.grant_probe(&mut inner, now))
                } else {
                    Err(self.config.recovery_timeout - elapsed)
                }
            }
            CircuitState::HalfOpen => {
                let lease_expiry = inner.probe.as_ref().map(|lease| lease.expires_at);
                match lease_expiry {
                    Some(expires_at) if expires_at > now => {
                        debug!(dependency = %self.dependency, "Probe already in flight, short-circuiting");
                        Err((expires_at - now).to_std().unwrap_or(Duration::ZERO))
                    }
                    Some(_) => {
                        warn!(dependency = %self.dependency, "Probe lease expired, granting a new probe");
                        Ok(self.grant_probe(&mut inner, now))
                    }
                    None => Ok(self.grant_probe(&mut inner, now)),
                }
            }
        }
    }

    fn grant_probe(&self, inner: &mut BreakerInner, now: DateTime<Utc>) -> Admission {
        inner.next_token += 1;
        let token = inner.next_token;
        let expires_at = chrono::Duration::from_std(self.config.probe_lease)
            .ok()
            .and_then(|lease| now.checked_add_signed(lease))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        inner.probe = Some(ProbeLease { token, expires_at });
        Admission::Probe(token)
    }

    fn record(&self, admission: Admission, success: bool) {
        let now = self.clock.now();
        let mut inner = self.lock();
        match admission {
            Admission::Pass => {
                if success {
                    if inner.state == CircuitState::Closed {
                        inner.consecutive_failures = 0;
                    }
                    return;
                }
                inner.last_failure_at = Some(now);
                if inner.state != CircuitState::Closed {
                    return;
                }
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    self.trip(&mut inner, now);
                }
            }
            Admission::Probe(token) => {
                let holds_lease = inner.state == CircuitState::HalfOpen
                    && inner.probe.as_ref().is_some_and(|p| p.token == token);
                if !holds_lease {
                    debug!(dependency = %self.dependency, "Ignoring outcome of superseded probe");
                    return;
                }
                inner.probe = None;
                if success {
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.opened_at = None;
                    info!(dependency = %self.dependency, "Circuit breaker closed after successful probe");
                } else {
                    inner.last_failure_at = Some(now);
                    inner.consecutive_failures += 1;
                    self.trip(&mut inner, now);
                }
            }
        }
    }

    fn release(&self, admission: Admission) {
        if let Admission::Probe(token) = admission {
            let mut inner = self.lock();
            if inner.probe.as_ref().is_some_and(|p| p.token == token) {
                inner.probe = None;
                debug!(dependency = %self.dependency, "Probe abandoned, lease released");
            }
        }
    }

    fn trip(&self, inner: &mut BreakerInner, now: DateTime<Utc>) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(now);
        inner.probe = None;
        inner.total_trips += 1;
        warn!(
            dependency = %self.dependency,
            failures = inner.consecutive_failures,
            "Circuit breaker OPEN"
        );
    }
}

/// Settles the admission exactly once; dropping it unsettled (the caller's
/// future was cancelled) only releases a held probe lease.
struct AdmissionGuard<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    settled: bool,
}

impl AdmissionGuard<'_> {
    fn settle(&mut self, success: bool) {
        self.settled = true;
        self.breaker.record(self.admission, success);
    }
}

impl Drop for AdmissionGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.release(self.admission);
        }
    }
}
