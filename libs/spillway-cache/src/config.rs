use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use spillway_heap::DEFAULT_BLOCK_SIZE;

/// Tuning knobs for a [`CachingDictionary`](crate::CachingDictionary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Granularity the heap's address space grows by.
    pub block_size: u64,

    /// Maximum number of entries held in the in-memory tier.
    pub local_capacity: NonZeroUsize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            local_capacity: NonZeroUsize::new(256).expect("default capacity is non-zero"),
        }
    }
}
