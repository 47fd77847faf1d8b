//! Key→handle index over the serializing cache.

use std::{collections::HashMap, fmt, hash::Hash};

use spillway_heap::{Handle, Medium};

use crate::{
    codec::ValueCodec,
    error::{Error, Result},
    serializing::SerializingCache,
};

/// The persistent tier: every value lives in the heap, and the in-memory
/// state is only the `K → Handle` index. The index is authoritative and is
/// discarded on disposal; nothing is reconstructable from the heap alone.
pub struct PersistentDictionary<K, V, C, M> {
    index: HashMap<K, Handle>,
    cache: SerializingCache<V, C, M>,
}

impl<K, V, C, M> fmt::Debug for PersistentDictionary<K, V, C, M> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("PersistentDictionary")
            .field("len", &self.index.len())
            .finish_non_exhaustive()
    }
}

impl<K, V, C, M> PersistentDictionary<K, V, C, M>
where
    K: Eq + Hash + fmt::Debug,
    C: ValueCodec<V>,
    M: Medium,
{
    #[must_use]
    pub fn new(cache: SerializingCache<V, C, M>) -> Self {
        Self {
            index: HashMap::new(),
            cache,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Stores a fresh entry.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateKey`] if the key is already indexed.
    pub fn add(&mut self, key: K, value: &V) -> Result<()> {
        if self.index.contains_key(&key) {
            return Err(Error::DuplicateKey(format!("{key:?}")));
        }
        let handle = self.cache.create(value)?;
        self.index.insert(key, handle);
        Ok(())
    }

    /// Removes an entry and frees its heap block. Returns whether the key was
    /// present.
    pub fn remove(&mut self, key: &K) -> Result<bool> {
        let Some(handle) = self.index.remove(key) else {
            return Ok(false);
        };
        self.cache.delete(handle)?;
        Ok(true)
    }

    /// Reads the value stored for `key`, or `None` if the key is not indexed.
    pub fn try_get(&mut self, key: &K) -> Result<Option<V>> {
        let Some(&handle) = self.index.get(key) else {
            return Ok(None);
        };
        self.cache.read(handle).map(Some)
    }

    /// Like [`try_get`](Self::try_get), but a miss is an error.
    pub fn get(&mut self, key: &K) -> Result<V> {
        self.try_get(key)?
            .ok_or_else(|| Error::KeyNotFound(format!("{key:?}")))
    }

    /// Writes `value` under `key`, replacing the previous value if present.
    /// A replacement may relocate the entry's block; the index follows the
    /// handle.
    pub fn set(&mut self, key: K, value: &V) -> Result<()> {
        if let Some(&handle) = self.index.get(&key) {
            let replacement = self.cache.update(handle, value)?;
            if replacement != handle {
                self.index.insert(key, replacement);
            }
        } else {
            let handle = self.cache.create(value)?;
            self.index.insert(key, handle);
        }
        Ok(())
    }

    /// Iterates all entries, decoding each value as it is yielded. The order
    /// is unspecified but stable while the dictionary is not mutated.
    pub fn iter(&mut self) -> impl Iterator<Item = Result<(K, V)>> + '_
    where
        K: Clone,
    {
        let Self { index, cache } = self;
        index
            .iter()
            .map(move |(key, &handle)| cache.read(handle).map(|value| (key.clone(), value)))
    }

    /// Deletes every entry's heap block and clears the index.
    pub fn clear(&mut self) -> Result<()> {
        let Self { index, cache } = self;
        for &handle in index.values() {
            cache.delete(handle)?;
        }
        index.clear();
        Ok(())
    }

    /// Disposes the underlying cache (and heap, and medium).
    pub fn dispose(self) -> Result<()> {
        self.cache.dispose()
    }
}

#[cfg(test)]
mod tests {
    use spillway_heap::Heap;

    use super::*;
    use crate::codec::JsonCodec;

    fn dictionary() -> PersistentDictionary<
        String,
        u32,
        JsonCodec<u32>,
        spillway_heap::MemoryMedium,
    > {
        PersistentDictionary::new(SerializingCache::new(Heap::in_memory(64), JsonCodec::new()))
    }

    #[test]
    fn add_then_get_round_trips() {
        let mut dictionary = dictionary();
        dictionary.add("one".to_owned(), &1).expect("should add");
        assert_eq!(dictionary.get(&"one".to_owned()).expect("should read"), 1);
        assert!(dictionary.contains(&"one".to_owned()));
        assert_eq!(dictionary.len(), 1);
    }

    #[test]
    fn add_rejects_duplicates() {
        let mut dictionary = dictionary();
        dictionary.add("k".to_owned(), &1).expect("should add");
        assert!(matches!(
            dictionary.add("k".to_owned(), &2),
            Err(Error::DuplicateKey(_))
        ));
    }

    #[test]
    fn get_reports_missing_keys() {
        let mut dictionary = dictionary();
        assert!(matches!(
            dictionary.get(&"absent".to_owned()),
            Err(Error::KeyNotFound(_))
        ));
        assert_eq!(
            dictionary.try_get(&"absent".to_owned()).expect("should look up"),
            None
        );
    }

    #[test]
    fn remove_frees_and_unindexes() {
        let mut dictionary = dictionary();
        dictionary.add("k".to_owned(), &1).expect("should add");
        assert!(dictionary.remove(&"k".to_owned()).expect("should remove"));
        assert!(!dictionary.remove(&"k".to_owned()).expect("second remove is a no-op"));
        assert!(dictionary.is_empty());
    }

    #[test]
    fn set_updates_in_place_or_inserts() {
        let mut dictionary = dictionary();
        dictionary.set("k".to_owned(), &1).expect("should insert");
        dictionary.set("k".to_owned(), &1000).expect("should replace");
        assert_eq!(dictionary.get(&"k".to_owned()).expect("should read"), 1000);
        assert_eq!(dictionary.len(), 1);
    }

    #[test]
    fn iteration_yields_every_entry() {
        let mut dictionary = dictionary();
        for (key, value) in [("a", 1), ("b", 2), ("c", 3)] {
            dictionary.add(key.to_owned(), &value).expect("should add");
        }

        let mut entries: Vec<_> = dictionary
            .iter()
            .collect::<Result<_>>()
            .expect("all values should decode");
        entries.sort_unstable();
        assert_eq!(
            entries,
            vec![("a".to_owned(), 1), ("b".to_owned(), 2), ("c".to_owned(), 3)]
        );
    }

    #[test]
    fn clear_empties_the_dictionary() {
        let mut dictionary = dictionary();
        dictionary.add("a".to_owned(), &1).expect("should add");
        dictionary.add("b".to_owned(), &2).expect("should add");
        dictionary.clear().expect("should clear");
        assert!(dictionary.is_empty());
        dictionary.add("a".to_owned(), &3).expect("should add after clear");
        assert_eq!(dictionary.get(&"a".to_owned()).expect("should read"), 3);
    }
}
