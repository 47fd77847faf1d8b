//! Map with per-entry expiry.

use std::{
    collections::HashMap,
    fmt,
    hash::Hash,
    time::{Duration, Instant},
};

use crate::clock::{Clock, SystemClock};

/// A `K → V` map whose entries expire a fixed duration after they were last
/// written.
///
/// Expiry is lazy: an expired entry is dropped when it is touched or when
/// [`purge_expired`](Self::purge_expired) runs; no background sweeper exists.
/// Reads do not refresh the deadline; only writes do.
pub struct TimeoutDictionary<K, V, C = SystemClock> {
    entries: HashMap<K, (V, Instant)>,
    time_to_live: Duration,
    clock: C,
}

impl<K, V, C> fmt::Debug for TimeoutDictionary<K, V, C> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("TimeoutDictionary")
            .field("entries", &self.entries.len())
            .field("time_to_live", &self.time_to_live)
            .finish_non_exhaustive()
    }
}

impl<K: Eq + Hash, V> TimeoutDictionary<K, V> {
    #[must_use]
    pub fn new(time_to_live: Duration) -> Self {
        Self::with_clock(time_to_live, SystemClock)
    }
}

impl<K: Eq + Hash, V, C: Clock> TimeoutDictionary<K, V, C> {
    #[must_use]
    pub fn with_clock(time_to_live: Duration, clock: C) -> Self {
        Self {
            entries: HashMap::new(),
            time_to_live,
            clock,
        }
    }

    /// Writes an entry with a fresh deadline, returning the previous live
    /// value, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let now = self.clock.now();
        let deadline = now + self.time_to_live;
        self.entries
            .insert(key, (value, deadline))
            .filter(|(_, previous_deadline)| *previous_deadline > now)
            .map(|(previous, _)| previous)
    }

    /// Returns the live value for `key`; an expired entry is dropped on the
    /// spot and reads as a miss.
    pub fn try_get(&mut self, key: &K) -> Option<&V> {
        let now = self.clock.now();
        if self
            .entries
            .get(key)
            .is_some_and(|(_, deadline)| *deadline <= now)
        {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|(value, _)| value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let now = self.clock.now();
        self.entries
            .remove(key)
            .filter(|(_, deadline)| *deadline > now)
            .map(|(value, _)| value)
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        let now = self.clock.now();
        self.entries
            .get(key)
            .is_some_and(|(_, deadline)| *deadline > now)
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .values()
            .filter(|(_, deadline)| *deadline > now)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every expired entry now instead of waiting for it to be touched.
    pub fn purge_expired(&mut self) {
        let now = self.clock.now();
        self.entries.retain(|_, (_, deadline)| *deadline > now);
    }

    /// Iterates live entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        let now = self.clock.now();
        self.entries
            .iter()
            .filter(move |(_, (_, deadline))| *deadline > now)
            .map(|(key, (value, _))| (key, value))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
