//! Typed CRUD over the raw byte heap.

use core::marker::PhantomData;

use derive_where::derive_where;
use spillway_heap::{Handle, Heap, Medium};

use crate::{codec::ValueCodec, error::Result};

/// Stores typed values in a [`Heap`] by pushing them through a
/// [`ValueCodec`].
///
/// The cache adds no framing of its own: a value's block is exactly as long
/// as its encoding, and `update` keeps the handle stable only while the
/// encoded length stays the same.
#[derive_where(Debug; C, M)]
pub struct SerializingCache<T, C, M> {
    heap: Heap<M>,
    codec: C,
    /// We use `PhantomData` with `fn() -> T` instead of just `T` to ensure the
    /// cache doesn't impose any bounds on `T` unnecessarily (making it
    /// covariant rather than invariant)
    _marker: PhantomData<fn() -> T>,
}

impl<T, C, M> SerializingCache<T, C, M>
where
    C: ValueCodec<T>,
    M: Medium,
{
    pub const fn new(heap: Heap<M>, codec: C) -> Self {
        Self {
            heap,
            codec,
            _marker: PhantomData,
        }
    }

    /// Read-only view of the underlying heap.
    #[must_use]
    pub const fn heap(&self) -> &Heap<M> {
        &self.heap
    }

    /// Encodes `value` into a freshly allocated block.
    pub fn create(&mut self, value: &T) -> Result<Handle> {
        let bytes = self.codec.encode(value)?;
        let handle = self.heap.allocate(bytes.len() as u64)?;
        self.heap.write(handle, &bytes)?;
        Ok(handle)
    }

    /// Decodes the value stored behind `handle`.
    pub fn read(&mut self, handle: Handle) -> Result<T> {
        let bytes = self.heap.read(handle)?;
        self.codec.decode(&bytes)
    }

    /// Re-encodes `value` over `handle`. If the new encoding has the same
    /// length the block is rewritten in place and the handle survives;
    /// otherwise the old block is freed and a new one allocated. Callers must
    /// treat the returned handle as potentially changed either way.
    pub fn update(&mut self, handle: Handle, value: &T) -> Result<Handle> {
        let bytes = self.codec.encode(value)?;
        let block = self.heap.allocated_block(handle)?;
        if block.length() == bytes.len() as u64 {
            self.heap.write(handle, &bytes)?;
            return Ok(handle);
        }

        self.heap.free(handle)?;
        let replacement = self.heap.allocate(bytes.len() as u64)?;
        self.heap.write(replacement, &bytes)?;
        Ok(replacement)
    }

    /// Frees the block behind `handle`.
    pub fn delete(&mut self, handle: Handle) -> Result<()> {
        Ok(self.heap.free(handle)?)
    }

    /// Closes the heap (and whatever medium it owns).
    pub fn dispose(self) -> Result<()> {
        Ok(self.heap.dispose()?)
    }
}

#[cfg(test)]
mod tests {
    use spillway_heap::Heap;

    use super::*;
    use crate::codec::Utf8Codec;

    fn cache(block_size: u64) -> SerializingCache<String, Utf8Codec, spillway_heap::MemoryMedium> {
        SerializingCache::new(Heap::in_memory(block_size), Utf8Codec)
    }

    #[test]
    fn create_then_read_round_trips() {
        let mut cache = cache(16);
        let handle = cache.create(&"payload".to_owned()).expect("should create");
        assert_eq!(cache.read(handle).expect("should read"), "payload");
    }

    #[test]
    fn same_length_update_keeps_the_handle() {
        let mut cache = cache(16);
        let handle = cache.create(&"aaaa".to_owned()).expect("should create");
        let updated = cache
            .update(handle, &"bbbb".to_owned())
            .expect("should update");
        assert_eq!(updated, handle);
        assert_eq!(cache.read(updated).expect("should read"), "bbbb");
    }

    #[test]
    fn growing_update_relocates_and_frees_the_old_region() {
        let mut cache = cache(4);
        let first = cache.create(&"ab".to_owned()).expect("should create");
        let offset = cache
            .heap()
            .allocated_block(first)
            .expect("first is live")
            .offset();

        let second = cache
            .update(first, &"abcdef".to_owned())
            .expect("should update");
        assert_ne!(second, first);
        assert_eq!(cache.read(second).expect("should read"), "abcdef");
        assert!(matches!(
            cache.read(first),
            Err(crate::Error::Heap(spillway_heap::Error::InvalidHandle(_)))
        ));

        // The old region was freed before the reallocation, so the longer
        // value reclaims it as the low end of its own block.
        assert_eq!(
            cache
                .heap()
                .allocated_block(second)
                .expect("second is live")
                .offset(),
            offset,
        );
    }

    #[test]
    fn delete_invalidates_the_handle() {
        let mut cache = cache(8);
        let handle = cache.create(&"gone".to_owned()).expect("should create");
        cache.delete(handle).expect("should delete");
        assert!(cache.read(handle).is_err());
    }
}
