//! Deadline wheel used to find expired entries without a full scan

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Keys bucketed by the tick their deadline falls into
///
/// Ticks are counted from `origin` in steps of `resolution`. Deadlines
/// further out than one turn of the wheel share a slot with nearer ones, so
/// keys handed back by [`advance`](DeadlineWheel::advance) must be checked
/// against their real deadline and rescheduled if still alive.
pub(crate) struct DeadlineWheel<K> {
    origin: Instant,
    resolution: Duration,
    slots: Vec<HashSet<K>>,
    slot_of: HashMap<K, usize>,
    /// Last tick that was drained
    cursor: u64,
}

impl<K: Hash + Eq + Clone> DeadlineWheel<K> {
    /// A wheel turning once per `horizon` (at least 60 slots)
    pub(crate) fn new(resolution: Duration, horizon: Duration, origin: Instant) -> Self {
        let resolution = resolution.max(Duration::from_millis(1));
        let slots = (horizon.as_nanos() / resolution.as_nanos()) as usize + 1;

        Self {
            origin,
            resolution,
            slots: vec![HashSet::new(); slots.max(60)],
            slot_of: HashMap::new(),
            cursor: 0,
        }
    }

    fn tick_of(&self, at: Instant) -> u64 {
        let since = at.saturating_duration_since(self.origin);
        (since.as_nanos() / self.resolution.as_nanos()) as u64
    }

    /// Track `key` until `deadline`, replacing any earlier schedule
    pub(crate) fn schedule(&mut self, key: K, deadline: Instant) {
        self.unschedule(&key);

        // Round up so a key is never reported before its deadline's tick
        let tick = (self.tick_of(deadline) + 1).max(self.cursor + 1);
        let slot = (tick % self.slots.len() as u64) as usize;

        self.slots[slot].insert(key.clone());
        self.slot_of.insert(key, slot);
    }

    pub(crate) fn unschedule(&mut self, key: &K) {
        if let Some(slot) = self.slot_of.remove(key) {
            self.slots[slot].remove(key);
        }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &K) -> bool {
        self.slot_of.contains_key(key)
    }

    /// Drain every slot passed since the last call
    pub(crate) fn advance(&mut self, now: Instant) -> Vec<K> {
        let target = self.tick_of(now);
        if target <= self.cursor {
            return Vec::new();
        }

        let turns = (target - self.cursor).min(self.slots.len() as u64);
        let mut due = Vec::new();
        for step in 1..=turns {
            let slot = ((self.cursor + step) % self.slots.len() as u64) as usize;
            for key in self.slots[slot].drain() {
                self.slot_of.remove(&key);
                due.push(key);
            }
        }

        self.cursor = target;
        due
    }

    pub(crate) fn len(&self) -> usize {
        self.slot_of.len()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.iter_mut().for_each(HashSet::clear);
        self.slot_of.clear();
    }
}
