//! Bounded in-memory tier with LRU eviction.

use std::{
    collections::HashMap,
    fmt,
    hash::Hash,
    num::NonZeroUsize,
};

use crate::{
    error::{Error, Result},
    ring::CircularBuffer,
};

/// A bounded `K → V` map whose eviction order is tracked by a fixed-capacity
/// ring of keys, head = most recent.
///
/// Invariants: the key sets of the map and the ring are identical, and their
/// shared size never exceeds the capacity. Inserting into a full cache evicts
/// the least-recently-used entry and hands it back to the caller, which is
/// how the tiered dictionary demotes entries to its persistent tier.
pub struct LocalCache<K, V> {
    entries: HashMap<K, V>,
    recency: CircularBuffer<K>,
}

impl<K, V> fmt::Debug for LocalCache<K, V> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("LocalCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.recency.capacity())
            .finish_non_exhaustive()
    }
}

impl<K: Eq + Hash + Clone, V> LocalCache<K, V> {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.get()),
            recency: CircularBuffer::new(capacity.get()),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.recency.capacity()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts a fresh entry as most-recent. If the cache was full, the
    /// least-recently-used entry is evicted and returned.
    ///
    /// The key must not already be present; replacing a live entry goes
    /// through [`set`](Self::set) instead.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        debug_assert!(
            !self.entries.contains_key(&key),
            "inserted key must not already be cached"
        );
        let displaced = self
            .recency
            .enqueue(key.clone())
            .expect("recency ring has non-zero capacity");
        self.entries.insert(key, value);

        displaced.map(|evicted_key| {
            let evicted_value = self
                .entries
                .remove(&evicted_key)
                .expect("ring and map must hold the same keys");
            (evicted_key, evicted_value)
        })
    }

    /// Returns the value for `key` and promotes it to most-recent.
    pub fn try_get(&mut self, key: &K) -> Option<&V> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.promote(key);
        self.entries.get(key)
    }

    /// Like [`try_get`](Self::try_get), but a miss is an error.
    pub fn get(&mut self, key: &K) -> Result<&V>
    where
        K: fmt::Debug,
    {
        if self.try_get(key).is_none() {
            return Err(Error::KeyNotFound(format!("{key:?}")));
        }
        Ok(&self.entries[key])
    }

    /// Overwrites a live entry (promoting it), or inserts a fresh one. The
    /// eviction, if inserting caused one, is returned.
    pub fn set(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.entries.contains_key(&key) {
            self.promote(&key);
            self.entries.insert(key, value);
            None
        } else {
            self.insert(key, value)
        }
    }

    /// Removes an entry, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.entries.remove(key)?;
        let position = self
            .position(key)
            .expect("ring and map must hold the same keys");
        self.recency
            .remove_at(position)
            .expect("ring position was just located");
        Some(value)
    }

    /// Iterates entries oldest-first without promoting anything.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.recency.iter().map(|key| {
            let value = self
                .entries
                .get(key)
                .expect("ring and map must hold the same keys");
            (key, value)
        })
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    /// Moves `key` to the most-recent end of the ring. An empty ring means a
    /// miss upstream; a single-element ring is already most-recent.
    fn promote(&mut self, key: &K) {
        if self.recency.len() <= 1 {
            return;
        }
        let position = self
            .position(key)
            .expect("promoted key must be in the ring");
        let key = self
            .recency
            .remove_at(position)
            .expect("ring position was just located");
        self.recency
            .enqueue(key)
            .expect("ring cannot be full right after a removal");
    }

    fn position(&self, key: &K) -> Option<usize> {
        self.recency.iter().position(|queued| queued == key)
    }
}

#[cfg(test)]
mod tests {
    use rand::{RngExt as _, SeedableRng as _, rngs::StdRng};

    use super::*;

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).expect("test capacity must be non-zero")
    }

    #[test]
    fn insert_beyond_capacity_evicts_the_oldest() {
        let mut cache = LocalCache::new(capacity(2));
        assert_eq!(cache.insert("a", 1), None);
        assert_eq!(cache.insert("b", 2), None);
        assert_eq!(cache.insert("c", 3), Some(("a", 1)));
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&"a"));
    }

    #[test]
    fn try_get_promotes_to_most_recent() {
        let mut cache = LocalCache::new(capacity(2));
        cache.insert("a", 1);
        cache.insert("b", 2);

        assert_eq!(cache.try_get(&"a"), Some(&1));
        // "b" is now the oldest, so the next insert evicts it.
        assert_eq!(cache.insert("c", 3), Some(("b", 2)));
    }

    #[test]
    fn set_overwrites_and_promotes() {
        let mut cache = LocalCache::new(capacity(2));
        cache.insert("a", 1);
        cache.insert("b", 2);

        assert_eq!(cache.set("a", 10), None);
        assert_eq!(cache.insert("c", 3), Some(("b", 2)));
        assert_eq!(cache.try_get(&"a"), Some(&10));
    }

    #[test]
    fn remove_keeps_ring_and_map_aligned() {
        let mut cache = LocalCache::new(capacity(3));
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);

        assert_eq!(cache.remove(&"b"), Some(2));
        assert_eq!(cache.remove(&"b"), None);
        assert_eq!(cache.len(), 2);

        // The freed slot is usable again without evicting anything.
        assert_eq!(cache.insert("d", 4), None);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn iteration_is_oldest_first_and_does_not_promote() {
        let mut cache = LocalCache::new(capacity(3));
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);

        let keys: Vec<_> = cache.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);

        // Iterating must not have touched recency: "a" is still evicted first.
        assert_eq!(cache.insert("d", 4), Some(("a", 1)));
    }

    #[test]
    fn keysets_stay_identical_under_random_operations() {
        let mut cache = LocalCache::new(capacity(4));
        let mut rng = StdRng::seed_from_u64(7);

        for round in 0_u32..1000 {
            let key = rng.random_range(0_u8..12);
            match rng.random_range(0_u8..4) {
                0 => {
                    if !cache.contains(&key) {
                        cache.insert(key, round);
                    }
                }
                1 => {
                    cache.set(key, round);
                }
                2 => {
                    cache.remove(&key);
                }
                _ => {
                    cache.try_get(&key);
                }
            }

            let mut ring_keys: Vec<_> = cache.iter().map(|(key, _)| *key).collect();
            ring_keys.sort_unstable();
            let mut map_keys: Vec<_> = (0_u8..12).filter(|key| cache.contains(key)).collect();
            map_keys.sort_unstable();
            assert_eq!(ring_keys, map_keys, "ring and map diverged in round {round}");
            assert!(cache.len() <= cache.capacity());
        }
    }
}
