//! Coarse one-lock adapter around the single-threaded dictionary.

use std::{
    fmt,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard},
};

use spillway_heap::Medium;

use crate::{codec::ValueCodec, error::Result, tiered::CachingDictionary};

/// A cloneable handle that serializes every dictionary operation behind one
/// mutex.
///
/// The core is single-threaded by design; one coarse lock is the recommended
/// (and only correct) concurrency adapter, since no finer-grained locking
/// exists to compose with. Iteration is exposed as a snapshot taken under the
/// lock rather than an iterator that would hold it across yields.
pub struct SharedDictionary<K, V, C, M> {
    inner: Arc<Mutex<CachingDictionary<K, V, C, M>>>,
}

impl<K, V, C, M> Clone for SharedDictionary<K, V, C, M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, C, M> fmt::Debug for SharedDictionary<K, V, C, M> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("SharedDictionary").finish_non_exhaustive()
    }
}

impl<K, V, C, M> SharedDictionary<K, V, C, M>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
    C: ValueCodec<V>,
    M: Medium,
{
    #[must_use]
    pub fn new(dictionary: CachingDictionary<K, V, C, M>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(dictionary)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CachingDictionary<K, V, C, M>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn add(&self, key: K, value: V) -> Result<()> {
        self.lock().add(key, value)
    }

    pub fn remove(&self, key: &K) -> Result<bool> {
        self.lock().remove(key)
    }

    pub fn try_get(&self, key: &K) -> Result<Option<V>> {
        self.lock().try_get(key)
    }

    pub fn get(&self, key: &K) -> Result<V> {
        self.lock().get(key)
    }

    pub fn set(&self, key: K, value: V) -> Result<()> {
        self.lock().set(key, value)
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.lock().contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Collects every entry under the lock.
    pub fn entries(&self) -> Result<Vec<(K, V)>> {
        self.lock().iter().collect()
    }

    pub fn clear(&self) -> Result<()> {
        self.lock().clear()
    }

    /// Disposes the dictionary if this is the last handle; other live handles
    /// keep it open and this call is a no-op.
    pub fn dispose(self) -> Result<()> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex
                .into_inner()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .dispose(),
            Err(_still_shared) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::{codec::JsonCodec, config::CacheConfig};

    #[test]
    fn concurrent_writers_serialize_cleanly() {
        let dictionary = SharedDictionary::new(CachingDictionary::<String, u32, _, _>::in_memory(
            &CacheConfig {
                local_capacity: std::num::NonZeroUsize::new(4).expect("non-zero"),
                ..CacheConfig::default()
            },
            JsonCodec::new(),
        ));

        thread::scope(|scope| {
            for worker in 0_u32..4 {
                let handle = dictionary.clone();
                scope.spawn(move || {
                    for item in 0_u32..25 {
                        handle
                            .add(format!("{worker}/{item}"), worker * 100 + item)
                            .expect("distinct keys should insert");
                    }
                });
            }
        });

        assert_eq!(dictionary.len(), 100);
        for worker in 0_u32..4 {
            let key = format!("{worker}/13");
            assert_eq!(
                dictionary.get(&key).expect("should read back"),
                worker * 100 + 13
            );
        }
    }

    #[test]
    fn dispose_yields_to_other_handles() {
        let dictionary = SharedDictionary::new(CachingDictionary::<String, u32, _, _>::in_memory(
            &CacheConfig::default(),
            JsonCodec::new(),
        ));
        let second = dictionary.clone();
        dictionary.dispose().expect("shared dispose is a no-op");
        second.add("k".to_owned(), 1).expect("should still be usable");
        second.dispose().expect("last handle disposes for real");
    }
}
