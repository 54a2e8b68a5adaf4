//! Provider results and lookup outcomes

use std::time::Duration;

use crate::CacheError;

/// A pair of relative lifetimes: how long a value stays fresh and how long
/// it stays usable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ttls {
    /// Fresh window: served without any refresh
    pub actual: Duration,
    /// Total usable life: stale-but-usable after `actual`, expired after this
    pub usable: Duration,
}

impl Ttls {
    /// No lifetime at all; the value is never retained
    pub const ZERO: Ttls = Ttls {
        actual: Duration::ZERO,
        usable: Duration::ZERO,
    };

    pub fn new(actual: Duration, usable: Duration) -> Self {
        Self { actual, usable }
    }

    /// Fresh for half of the usable life, stale for the other half
    pub fn halved(usable: Duration) -> Self {
        Self {
            actual: usable / 2,
            usable,
        }
    }

    /// Same pair with `actual` clamped to `usable`
    pub fn normalized(self) -> Self {
        Self {
            actual: self.actual.min(self.usable),
            usable: self.usable,
        }
    }

    /// Grace window between going stale and expiring
    pub fn grace(&self) -> Duration {
        self.usable.saturating_sub(self.actual)
    }
}

/// What a value provider hands back for one key
#[derive(Debug, Clone)]
pub struct Provided<V> {
    /// The produced value or the provider's failure
    pub result: Result<V, CacheError>,
    /// Lifetimes to cache the outcome with
    pub ttl: Ttls,
}

impl<V> Provided<V> {
    /// A successful value
    pub fn ok(value: V, ttl: Ttls) -> Self {
        Self {
            result: Ok(value),
            ttl,
        }
    }

    /// A failure, cached negatively for `ttl`
    pub fn failed(error: CacheError, ttl: Ttls) -> Self {
        Self {
            result: Err(error),
            ttl,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcome of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<V> {
    /// A successful value, fresh, stale or just provided, with what remains
    /// of its lifetime when the tier knows it
    Value(V, Option<Ttls>),
    /// A provider failure (live or negative cached) or a configuration error
    Failed(CacheError, Option<Ttls>),
    /// Nothing usable was cached; the caller's default while an update runs
    Default(V),
}

impl<V> Fetched<V> {
    /// True only for a successful value
    pub fn is_ok(&self) -> bool {
        matches!(self, Fetched::Value(..))
    }

    /// The carried value, including a caller default
    pub fn value(&self) -> Option<&V> {
        match self {
            Fetched::Value(value, _) | Fetched::Default(value) => Some(value),
            Fetched::Failed(..) => None,
        }
    }

    /// The error for a failed lookup
    pub fn error(&self) -> Option<&CacheError> {
        match self {
            Fetched::Failed(err, _) => Some(err),
            _ => None,
        }
    }

    /// Remaining lifetime reported by the tier, if any
    pub fn ttl(&self) -> Option<Ttls> {
        match self {
            Fetched::Value(_, ttl) | Fetched::Failed(_, ttl) => *ttl,
            Fetched::Default(_) => None,
        }
    }

    /// Convert into a plain result; a default value counts as not ready
    pub fn into_result(self) -> Result<V, CacheError> {
        match self {
            Fetched::Value(value, _) => Ok(value),
            Fetched::Failed(err, _) => Err(err),
            Fetched::Default(_) => Err(CacheError::NotReady),
        }
    }

    /// The successful value, if any
    pub fn ok(self) -> Option<V> {
        match self {
            Fetched::Value(value, _) => Some(value),
            _ => None,
        }
    }

    /// Map the carried value
    pub fn map<U, F>(self, f: F) -> Fetched<U>
    where
        F: FnOnce(V) -> U,
    {
        match self {
            Fetched::Value(value, ttl) => Fetched::Value(f(value), ttl),
            Fetched::Failed(err, ttl) => Fetched::Failed(err, ttl),
            Fetched::Default(value) => Fetched::Default(f(value)),
        }
    }
}
