//! The two-tier dictionary façade.

use std::{fmt, hash::Hash};

use spillway_heap::{FileMedium, Heap, Medium, MemoryMedium};
use tracing::trace;

use crate::{
    codec::ValueCodec,
    config::CacheConfig,
    error::{Error, Result},
    local::LocalCache,
    persistent::PersistentDictionary,
    serializing::SerializingCache,
};

/// A dictionary that keeps its hottest entries in a bounded in-memory tier
/// and spills everything else to a byte heap.
///
/// Every key lives in exactly one tier. Reads that hit the persistent tier
/// *promote* the key into the local tier, and whatever LRU entry that pushes
/// out is *demoted* back to the heap. Promotion is the only demotion trigger;
/// there is no background sweeper.
pub struct CachingDictionary<K, V, C, M> {
    local: LocalCache<K, V>,
    persistent: PersistentDictionary<K, V, C, M>,
}

impl<K, V, C, M> fmt::Debug for CachingDictionary<K, V, C, M> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("CachingDictionary")
            .field("local", &self.local)
            .field("persistent", &self.persistent)
            .finish()
    }
}

impl<K, V, C> CachingDictionary<K, V, C, MemoryMedium>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
    C: ValueCodec<V>,
{
    /// Dictionary whose persistent tier spills into an in-memory heap,
    /// useful for tests and for bounding only by recency, not storage.
    #[must_use]
    pub fn in_memory(config: &CacheConfig, codec: C) -> Self {
        Self::new(config, Heap::in_memory(config.block_size), codec)
    }
}

impl<K, V, C> CachingDictionary<K, V, C, FileMedium>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
    C: ValueCodec<V>,
{
    /// Dictionary whose persistent tier spills into a scratch file that is
    /// deleted on disposal.
    pub fn temporary(config: &CacheConfig, codec: C) -> Result<Self> {
        Ok(Self::new(
            config,
            Heap::temporary(config.block_size)?,
            codec,
        ))
    }
}

impl<K, V, C, M> CachingDictionary<K, V, C, M>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
    C: ValueCodec<V>,
    M: Medium,
{
    /// Composes the tiers over an existing heap.
    pub fn new(config: &CacheConfig, heap: Heap<M>, codec: C) -> Self {
        Self {
            local: LocalCache::new(config.local_capacity),
            persistent: PersistentDictionary::new(SerializingCache::new(heap, codec)),
        }
    }

    /// Total number of entries across both tiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.local.len() + self.persistent.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.local.contains(key) || self.persistent.contains(key)
    }

    /// Number of entries currently held in memory.
    #[must_use]
    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    /// Inserts a fresh entry as most-recently-used.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateKey`] if the key is present in either tier.
    pub fn add(&mut self, key: K, value: V) -> Result<()> {
        if self.contains(&key) {
            return Err(Error::DuplicateKey(format!("{key:?}")));
        }
        let evicted = self.local.insert(key, value);
        self.demote(evicted)
    }

    /// Removes an entry from whichever tier holds it. Returns whether the key
    /// was present.
    pub fn remove(&mut self, key: &K) -> Result<bool> {
        if self.local.remove(key).is_some() {
            return Ok(true);
        }
        self.persistent.remove(key)
    }

    /// Looks the key up, promoting a persistent hit into the local tier.
    pub fn try_get(&mut self, key: &K) -> Result<Option<V>> {
        if let Some(value) = self.local.try_get(key) {
            return Ok(Some(value.clone()));
        }
        let Some(value) = self.persistent.try_get(key)? else {
            return Ok(None);
        };
        self.make_local(key.clone(), value.clone())?;
        Ok(Some(value))
    }

    /// Like [`try_get`](Self::try_get), but a miss is an error.
    pub fn get(&mut self, key: &K) -> Result<V> {
        self.try_get(key)?
            .ok_or_else(|| Error::KeyNotFound(format!("{key:?}")))
    }

    /// Writes `value` under `key`: in place for a local key, as a promotion
    /// for a persistent key, as a fresh insert otherwise.
    pub fn set(&mut self, key: K, value: V) -> Result<()> {
        if self.local.contains(&key) {
            let evicted = self.local.set(key, value);
            debug_assert!(evicted.is_none(), "overwriting a local key cannot evict");
            Ok(())
        } else if self.persistent.contains(&key) {
            // The write is merged into the promotion: the persistent copy is
            // dropped unread and the new value enters the local tier.
            self.make_local(key, value)
        } else {
            self.add(key, value)
        }
    }

    /// Iterates local entries, then persistent entries. No promotion happens;
    /// the dictionary must not be mutated while iterating.
    pub fn iter(&mut self) -> impl Iterator<Item = Result<(K, V)>> + '_ {
        let Self { local, persistent } = self;
        local
            .iter()
            .map(|(key, value)| Ok((key.clone(), value.clone())))
            .chain(persistent.iter())
    }

    /// Clears both tiers.
    pub fn clear(&mut self) -> Result<()> {
        self.local.clear();
        self.persistent.clear()
    }

    /// Disposes the persistent tier, its cache, heap and medium.
    pub fn dispose(self) -> Result<()> {
        self.persistent.dispose()
    }

    /// Moves `key` from the persistent tier into the local tier, demoting
    /// whatever the local tier evicts to make room.
    fn make_local(&mut self, key: K, value: V) -> Result<()> {
        self.persistent.remove(&key)?;
        trace!(key = ?key, "promoted entry to the local tier");
        let evicted = self.local.insert(key, value);
        self.demote(evicted)
    }

    fn demote(&mut self, evicted: Option<(K, V)>) -> Result<()> {
        if let Some((key, value)) = evicted {
            trace!(key = ?key, "demoted entry to the persistent tier");
            self.persistent.add(key, &value)?;
        }
        Ok(())
    }
}
