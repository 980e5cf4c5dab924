//! Circuit breaker guarding calls to one named external dependency.
//!
//! State lives behind a `parking_lot::Mutex` that is only ever held for a few
//! field updates, never across an `.await`. The wrapped operation runs outside
//! the lock so slow dependencies never serialize the workers calling them.

use std::{
    fmt,
    future::Future,
    time::{Duration, Instant},
};

use auditgate_model::{BreakerSnapshot, CircuitState};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::{AuditError, Result};

/// Tuning knobs for a single breaker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures in `closed` before the breaker opens.
    pub failure_threshold: u32,
    /// Consecutive successful probes in `halfOpen` before it closes again.
    pub success_threshold: u32,
    /// Time spent `open` before a probe is admitted.
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
    opened_at_wall: Option<DateTime<Utc>>,
    probe_in_flight: bool,
}

impl BreakerInner {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            opened_at: None,
            opened_at_wall: None,
            probe_in_flight: false,
        }
    }
}

/// How a call got through the breaker. Probes are the single calls allowed
/// while half-open and are the only ones whose outcome moves that state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Admission {
    Normal,
    Probe,
}

pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("CircuitBreaker");
        debug.field("name", &self.name).field("config", &self.config);

        match self.inner.try_lock() {
            Some(inner) => {
                debug
                    .field("state", &inner.state)
                    .field("consecutive_failures", &inner.consecutive_failures)
                    .field(
                        "consecutive_successes",
                        &inner.consecutive_successes,
                    );
            }
            None => {
                debug.field("state", &"<locked>");
            }
        }

        debug.finish()
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner::closed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> BreakerConfig {
        self.config
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            opened_at: inner.opened_at_wall,
        }
    }

    /// Runs `op` unless the circuit is open. Every error returned by `op`
    /// counts as a failure of the dependency; the breaker itself never
    /// retries.
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let admission = self.admit()?;
        let mut guard = CallGuard {
            breaker: self,
            admission,
            settled: false,
        };

        let outcome = op().await;
        match &outcome {
            Ok(_) => guard.settle(true),
            Err(err) => {
                tracing::debug!(
                    dependency = %self.name,
                    error = %err,
                    "guarded call failed"
                );
                guard.settle(false);
            }
        }
        outcome
    }

    /// Operator override: forget all history and close the circuit.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        *inner = BreakerInner::closed();
        info!(dependency = %self.name, "circuit breaker manually reset");
    }

    fn admit(&self) -> Result<Admission> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Ok(Admission::Normal),
            CircuitState::Open => {
                let cooled_down = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.cooldown)
                    .unwrap_or(true);
                if cooled_down {
                    inner.state = CircuitState::HalfOpen;
                    inner.consecutive_successes = 0;
                    inner.probe_in_flight = true;
                    info!(
                        dependency = %self.name,
                        "cooldown elapsed; admitting half-open probe"
                    );
                    Ok(Admission::Probe)
                } else {
                    Err(self.open_error())
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(self.open_error())
                } else {
                    inner.probe_in_flight = true;
                    Ok(Admission::Probe)
                }
            }
        }
    }

    fn record_success(&self, admission: Admission) {
        let mut inner = self.inner.lock();
        match (inner.state, admission) {
            (CircuitState::Closed, _) => {
                inner.consecutive_failures = 0;
            }
            (CircuitState::HalfOpen, Admission::Probe) => {
                inner.probe_in_flight = false;
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_threshold
                {
                    *inner = BreakerInner::closed();
                    info!(dependency = %self.name, "circuit breaker closed");
                }
            }
            // Calls admitted before the circuit opened carry no signal about
            // the dependency's current health.
            _ => {}
        }
    }

    fn record_failure(&self, admission: Admission) {
        let mut inner = self.inner.lock();
        match (inner.state, admission) {
            (CircuitState::Closed, _) => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    self.trip(&mut inner);
                }
            }
            (CircuitState::HalfOpen, Admission::Probe) => {
                inner.consecutive_failures += 1;
                self.trip(&mut inner);
            }
            (CircuitState::Open, Admission::Normal) => {
                inner.consecutive_failures += 1;
            }
            _ => {}
        }
    }

    fn trip(&self, inner: &mut BreakerInner) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.opened_at_wall = Some(Utc::now());
        inner.consecutive_successes = 0;
        inner.probe_in_flight = false;
        warn!(
            dependency = %self.name,
            failures = inner.consecutive_failures,
            cooldown_ms = self.config.cooldown.as_millis() as u64,
            "circuit breaker opened"
        );
    }

    fn open_error(&self) -> AuditError {
        AuditError::CircuitOpen {
            dependency: self.name.clone(),
        }
    }
}

/// Settles the admission exactly once. A probe whose future is dropped before
/// finishing counts as failed so the half-open slot is never leaked.
struct CallGuard<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    settled: bool,
}

impl CallGuard<'_> {
    fn settle(&mut self, success: bool) {
        self.settled = true;
        if success {
            self.breaker.record_success(self.admission);
        } else {
            self.breaker.record_failure(self.admission);
        }
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if !self.settled && self.admission == Admission::Probe {
            warn!(
                dependency = %self.breaker.name,
                "half-open probe abandoned before completion"
            );
            self.breaker.record_failure(self.admission);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn breaker(failures: u32, successes: u32, cooldown_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(
            "dom-scanner",
            BreakerConfig {
                failure_threshold: failures,
                success_threshold: successes,
                cooldown: Duration::from_millis(cooldown_ms),
            },
        )
    }

    async fn fail(breaker: &CircuitBreaker, calls: &AtomicUsize) -> Result<()> {
        breaker
            .call(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AuditError::CheckFailed("boom".into()))
            })
            .await
    }

    async fn succeed(
        breaker: &CircuitBreaker,
        calls: &AtomicUsize,
    ) -> Result<()> {
        breaker
            .call(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
    }

    #[tokio::test]
    async fn opens_after_threshold_and_short_circuits_during_cooldown() {
        let breaker = breaker(5, 2, 60_000);
        let calls = AtomicUsize::new(0);

        for _ in 0..5 {
            let err = fail(&breaker, &calls).await.unwrap_err();
            assert!(matches!(err, AuditError::CheckFailed(_)));
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        let err = succeed(&breaker, &calls).await.unwrap_err();
        assert!(matches!(err, AuditError::CircuitOpen { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 5, "operation must not run");
        assert!(breaker.snapshot().opened_at.is_some());
    }

    #[tokio::test]
    async fn success_resets_the_failure_streak() {
        let breaker = breaker(3, 2, 60_000);
        let calls = AtomicUsize::new(0);

        fail(&breaker, &calls).await.unwrap_err();
        fail(&breaker, &calls).await.unwrap_err();
        succeed(&breaker, &calls).await.unwrap();
        fail(&breaker, &calls).await.unwrap_err();
        fail(&breaker, &calls).await.unwrap_err();

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.snapshot().consecutive_failures, 2);
    }

    #[tokio::test]
    async fn half_open_probes_close_after_success_threshold() {
        let breaker = breaker(1, 2, 20);
        let calls = AtomicUsize::new(0);

        fail(&breaker, &calls).await.unwrap_err();
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(40)).await;
        succeed(&breaker, &calls).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert_eq!(breaker.snapshot().consecutive_successes, 1);

        succeed(&breaker, &calls).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);
        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.consecutive_failures, 0);
        assert_eq!(snapshot.consecutive_successes, 0);
        assert!(snapshot.opened_at.is_none());
    }

    #[tokio::test]
    async fn failed_probe_reopens_immediately() {
        let breaker = breaker(1, 2, 20);
        let calls = AtomicUsize::new(0);

        fail(&breaker, &calls).await.unwrap_err();
        let first_open = breaker.snapshot().opened_at.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        fail(&breaker, &calls).await.unwrap_err();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(breaker.snapshot().opened_at.unwrap() >= first_open);

        let before = calls.load(Ordering::SeqCst);
        let err = succeed(&breaker, &calls).await.unwrap_err();
        assert!(matches!(err, AuditError::CircuitOpen { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn only_one_probe_in_flight_while_half_open() {
        let breaker = Arc::new(breaker(1, 1, 10));
        let calls = Arc::new(AtomicUsize::new(0));

        fail(&breaker, &calls).await.unwrap_err();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let probe = {
            let breaker = Arc::clone(&breaker);
            tokio::spawn(async move {
                breaker
                    .call(|| async move {
                        let _ = release_rx.await;
                        Ok::<_, AuditError>(())
                    })
                    .await
            })
        };

        // Let the probe get admitted before racing it.
        while breaker.state() != CircuitState::HalfOpen {
            tokio::task::yield_now().await;
        }

        let err = succeed(&breaker, &calls).await.unwrap_err();
        assert!(matches!(err, AuditError::CircuitOpen { .. }));

        release_tx.send(()).unwrap();
        probe.await.unwrap().unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn abandoned_probe_reopens_the_circuit() {
        let breaker = breaker(1, 1, 10);
        let calls = AtomicUsize::new(0);

        fail(&breaker, &calls).await.unwrap_err();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let hung = breaker.call(|| async {
            std::future::pending::<()>().await;
            Ok::<_, AuditError>(())
        });
        let timed_out =
            tokio::time::timeout(Duration::from_millis(10), hung).await;
        assert!(timed_out.is_err());

        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn reset_closes_an_open_circuit() {
        let breaker = breaker(1, 2, 60_000);
        let calls = AtomicUsize::new(0);

        fail(&breaker, &calls).await.unwrap_err();
        assert_eq!(breaker.state(), CircuitState::Open);

        breaker.reset();
        succeed(&breaker, &calls).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
