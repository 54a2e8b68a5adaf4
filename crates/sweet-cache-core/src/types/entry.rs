//! Cache entry type and its TTL state machine

use std::time::{Duration, Instant};

use super::fetched::{Fetched, Provided, Ttls};
use crate::CacheError;

/// Where an entry sits on its lifetime at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Before `actual_until`: served as-is
    Fresh,
    /// Between `actual_until` and `usable_until`: served, refresh scheduled
    Stale,
    /// At or after `usable_until`: must be recomputed
    Expired,
}

/// A cached provider outcome with its freshness window
///
/// Entries are immutable. A new provider result replaces the entry, it
/// never updates one in place. A deadline of `None` lies past anything the
/// clock can represent and is never reached.
#[derive(Debug, Clone)]
pub struct CacheItem<V> {
    result: Result<V, CacheError>,
    actual_until: Option<Instant>,
    usable_until: Option<Instant>,
}

fn reached(deadline: Option<Instant>, now: Instant) -> bool {
    deadline.is_some_and(|at| now >= at)
}

fn left_until(deadline: Option<Instant>, now: Instant) -> Duration {
    deadline.map_or(Duration::MAX, |at| at.saturating_duration_since(now))
}

impl<V> CacheItem<V> {
    /// Build an entry from a provider result
    ///
    /// `now` must be read after the provider returned. An actual TTL longer
    /// than the usable TTL is clamped so that `actual_until <= usable_until`.
    pub fn from_provided(provided: Provided<V>, now: Instant) -> Self {
        let ttl = provided.ttl.normalized();
        Self {
            result: provided.result,
            actual_until: now.checked_add(ttl.actual),
            usable_until: now.checked_add(ttl.usable),
        }
    }

    /// Classify the entry against a clock reading
    pub fn freshness(&self, now: Instant) -> Freshness {
        if !reached(self.actual_until, now) {
            Freshness::Fresh
        } else if !reached(self.usable_until, now) {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }

    /// Whether the entry holds a successful value
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// The cached outcome
    pub fn result(&self) -> &Result<V, CacheError> {
        &self.result
    }

    pub fn actual_until(&self) -> Option<Instant> {
        self.actual_until
    }

    pub fn usable_until(&self) -> Option<Instant> {
        self.usable_until
    }

    /// What is left of the entry's windows at `now`
    pub fn remaining(&self, now: Instant) -> Ttls {
        Ttls {
            actual: left_until(self.actual_until, now),
            usable: left_until(self.usable_until, now),
        }
    }

    /// Physical lifetime the backing store should keep the entry for
    ///
    /// `Duration::MAX` when the entry never expires.
    pub fn store_ttl(&self, now: Instant) -> Duration {
        left_until(self.usable_until, now)
    }
}

impl<V: Clone> CacheItem<V> {
    /// Hand the entry out to a caller
    pub fn fetched(&self, now: Instant) -> Fetched<V> {
        let remaining = Some(self.remaining(now));
        match &self.result {
            Ok(value) => Fetched::Value(value.clone(), remaining),
            Err(err) => Fetched::Failed(err.clone(), remaining),
        }
    }
}
