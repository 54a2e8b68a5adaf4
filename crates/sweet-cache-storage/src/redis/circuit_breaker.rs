use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sweet_cache_core::CacheError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Calls pass; counts consecutive failures
    Closed(u32),
    /// Calls are skipped until the instant
    Open(Instant),
    /// One probe call is out since the instant
    Probing(Instant),
}

/// Skips calls to a backend that keeps failing
///
/// After `failure_threshold` consecutive failures the breaker opens and
/// rejects calls for `reset_timeout`. Then a single probe is let through:
/// its success closes the breaker, its failure opens it again. A probe that
/// never reports back is replaced after another `reset_timeout`.
///
/// Clones share state.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    phase: Arc<Mutex<Phase>>,
    failure_threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            phase: Arc::new(Mutex::new(Phase::Closed(0))),
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
        }
    }

    /// Whether a call may go to the backend now
    pub fn allow_request(&self) -> bool {
        let mut phase = self.phase.lock();
        let now = Instant::now();
        match *phase {
            Phase::Closed(_) => true,
            Phase::Open(until) if now >= until => {
                *phase = Phase::Probing(now);
                true
            }
            Phase::Probing(since) if now.duration_since(since) >= self.reset_timeout => {
                *phase = Phase::Probing(now);
                true
            }
            Phase::Open(_) | Phase::Probing(_) => false,
        }
    }

    /// Whether calls are currently being skipped
    pub fn is_open(&self) -> bool {
        !matches!(*self.phase.lock(), Phase::Closed(_))
    }

    pub fn report_success(&self) {
        *self.phase.lock() = Phase::Closed(0);
    }

    pub fn report_failure(&self) {
        let mut phase = self.phase.lock();
        let reopen = Phase::Open(Instant::now() + self.reset_timeout);
        *phase = match *phase {
            Phase::Closed(failures) if failures + 1 >= self.failure_threshold => reopen,
            Phase::Closed(failures) => Phase::Closed(failures + 1),
            Phase::Probing(_) => reopen,
            open @ Phase::Open(_) => open,
        };
    }

    /// Feed an operation outcome into the breaker
    pub fn record<T>(&self, result: &Result<T, CacheError>) {
        match result {
            Err(err) if Self::is_failure(err) => self.report_failure(),
            _ => self.report_success(),
        }
    }

    /// Connection and server errors trip the breaker; bad payloads don't
    pub fn is_failure(err: &CacheError) -> bool {
        err.is_backend()
    }
}
