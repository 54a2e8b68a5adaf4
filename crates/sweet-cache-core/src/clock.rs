//! Time source used to classify entries

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the current instant
///
/// Caches read the clock once per operation and classify every entry
/// against that single reading.
pub trait Clock: Send + Sync + 'static {
    /// The current instant
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic TTL tests
///
/// Clones share the same time line.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }

    /// Jump to `elapsed` after the clock's origin
    ///
    /// The clock never moves backwards; an earlier target is ignored.
    pub fn set_elapsed(&self, elapsed: Duration) {
        let mut offset = self.offset.lock();
        if elapsed > *offset {
            *offset = elapsed;
        }
    }

    /// Time elapsed since the clock's origin
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}
