//! Two-tier caching dictionary.
//!
//! A [`CachingDictionary`] keeps a bounded set of recently-used entries in
//! memory (a [`LocalCache`], LRU over a fixed-capacity [`CircularBuffer`] of
//! keys) and transparently spills colder entries to a byte heap behind a
//! [`PersistentDictionary`]. Reads that hit the persistent tier *promote* the
//! key back into memory; whatever the promotion pushes out is *demoted* to
//! the heap. Values cross the byte boundary through a [`ValueCodec`] pair.
//!
//! ```
//! use spillway_cache::{CacheConfig, CachingDictionary, JsonCodec};
//!
//! let config = CacheConfig::default();
//! let mut dictionary = CachingDictionary::in_memory(&config, JsonCodec::new());
//!
//! dictionary.add("alpha".to_owned(), 1_u32)?;
//! dictionary.add("beta".to_owned(), 2_u32)?;
//! assert_eq!(dictionary.get(&"alpha".to_owned())?, 1);
//! assert_eq!(dictionary.len(), 2);
//! # Ok::<_, spillway_cache::Error>(())
//! ```
//!
//! The dictionary is single-threaded; [`SharedDictionary`] wraps it in the
//! one coarse lock that is the correct concurrency adapter here. Nothing is
//! durable: a temporary heap file is scratch space and is deleted on
//! disposal.

pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod local;
pub mod persistent;
pub mod ring;
pub mod serializing;
pub mod sync;
pub mod tiered;
pub mod timeout;

pub use spillway_heap::{
    DEFAULT_BLOCK_SIZE, FileMedium, Handle, Heap, Medium, MemoryMedium,
};

pub use self::{
    clock::{Clock, SystemClock},
    codec::{JsonCodec, Utf8Codec, ValueCodec},
    config::CacheConfig,
    error::{Error, Result},
    local::LocalCache,
    persistent::PersistentDictionary,
    ring::CircularBuffer,
    serializing::SerializingCache,
    sync::SharedDictionary,
    tiered::CachingDictionary,
    timeout::TimeoutDictionary,
};
