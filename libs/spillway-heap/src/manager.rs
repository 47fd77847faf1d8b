use std::collections::HashMap;

use tracing::trace;

use crate::{
    block::Block,
    error::{Error, Result},
    handle::Handle,
};

/// Granularity the address space grows by when no free block fits.
pub const DEFAULT_BLOCK_SIZE: u64 = 2048;

/// Bookkeeping for a handle-based allocator over an abstract linear address
/// space. The manager never touches storage; a [`Heap`](crate::Heap) pairs it
/// with a medium.
///
/// Invariants maintained across every operation:
///
/// - allocated blocks and free blocks together cover `[0, heap_length)`
///   exactly, with no overlap;
/// - after every [`free`](Self::free), no two free blocks are adjacent;
/// - an allocated block's length is exactly the length requested for it.
#[derive(Debug)]
pub struct HeapManager {
    free: Vec<Block>,
    allocated: HashMap<Handle, Block>,
    next_handle: u64,
    block_size: u64,
    heap_length: u64,
}

impl HeapManager {
    /// Creates an empty manager. The address space starts at length zero and
    /// grows in multiples of `block_size`.
    ///
    /// # Panics
    ///
    /// If `block_size` is zero.
    #[must_use]
    pub fn new(block_size: u64) -> Self {
        assert!(block_size > 0, "block size must be positive");
        Self {
            free: Vec::new(),
            allocated: HashMap::new(),
            next_handle: 0,
            block_size,
            heap_length: 0,
        }
    }

    /// Current end of the address space. Grows monotonically, never shrinks.
    #[must_use]
    pub const fn heap_length(&self) -> u64 {
        self.heap_length
    }

    /// Number of allocated blocks.
    #[must_use]
    pub fn allocated_count(&self) -> usize {
        self.allocated.len()
    }

    /// Read-only view of the allocated blocks, in no particular order.
    pub fn allocated_blocks(&self) -> impl Iterator<Item = &Block> {
        self.allocated.values()
    }

    /// Read-only view of the free set, in no particular order.
    pub fn free_blocks(&self) -> impl Iterator<Item = &Block> {
        self.free.iter()
    }

    /// Allocates a block of exactly `length` bytes and returns its handle.
    ///
    /// Selection is best-fit over the free set. An exact match leaves the free
    /// set; a strict over-match is split, keeping the remainder free. When no
    /// free block fits, the address space grows by the smallest multiple of
    /// the block size that covers `length` and selection is retried.
    ///
    /// Zero-length requests are permitted; the returned block transfers no
    /// bytes on read or write but must still be freed.
    pub fn allocate(&mut self, length: u64) -> Result<Handle> {
        if self.find_free_block(length).is_none() {
            self.create_free_block(length)?;
        }
        let free = self
            .find_free_block(length)
            .expect("a freshly grown heap must contain a fitting free block");

        let block = if free.length() == length {
            self.remove_free(free.handle());
            free
        } else {
            self.fragment(free, length)?
        };
        self.allocated.insert(block.handle(), block);
        trace!(
            handle = block.handle().into_raw(),
            offset = block.offset(),
            length,
            "allocated block"
        );
        Ok(block.handle())
    }

    /// Returns the block to the free set, coalescing it with the free block
    /// immediately before it and then the one immediately after it, if
    /// present. Coalescing never reduces the heap length.
    pub fn free(&mut self, handle: Handle) -> Result<()> {
        let block = self
            .allocated
            .remove(&handle)
            .ok_or(Error::InvalidHandle(handle))?;

        let mut offset = block.offset();
        let mut length = block.length();
        if let Some(index) = self.free.iter().position(|free| free.end() == offset) {
            let preceding = self.free.swap_remove(index);
            offset = preceding.offset();
            length += preceding.length();
        }
        if let Some(index) = self
            .free
            .iter()
            .position(|free| free.offset() == offset + length)
        {
            let following = self.free.swap_remove(index);
            length += following.length();
        }

        let merged = Block::new(self.fresh_handle(), offset, length);
        trace!(handle = handle.into_raw(), offset, length, "freed block");
        self.free.push(merged);
        Ok(())
    }

    /// Best-fit search: the smallest free block with `length >= requested`,
    /// or `None` if nothing fits. Ties on length resolve to the block
    /// encountered first, which is stable within a run but otherwise
    /// unspecified.
    #[must_use]
    pub fn find_free_block(&self, length: u64) -> Option<Block> {
        self.free
            .iter()
            .filter(|block| block.length() >= length)
            .min_by_key(|block| block.length())
            .copied()
    }

    /// Looks up an allocated block by handle.
    pub fn allocated_block(&self, handle: Handle) -> Result<Block> {
        self.allocated
            .get(&handle)
            .copied()
            .ok_or(Error::InvalidHandle(handle))
    }

    /// Extends the address space by the smallest multiple of the block size
    /// that is at least `min_length` and returns the resulting free block at
    /// the end of the heap. A free block already touching the end absorbs the
    /// new space under a fresh identity, so growth never leaves two adjacent
    /// free blocks behind. Exposed so a [`Heap`](crate::Heap) can resize its
    /// medium before the block becomes usable.
    pub fn create_free_block(&mut self, min_length: u64) -> Result<Block> {
        let grown = min_length
            .checked_next_multiple_of(self.block_size)
            .ok_or(Error::OutOfAddressSpace {
                length: self.heap_length,
                requested: min_length,
            })?;
        let new_length = self
            .heap_length
            .checked_add(grown)
            .ok_or(Error::OutOfAddressSpace {
                length: self.heap_length,
                requested: grown,
            })?;

        let (offset, length) = if let Some(index) = self
            .free
            .iter()
            .position(|free| free.end() == self.heap_length)
        {
            let tail = self.free.swap_remove(index);
            (tail.offset(), tail.length() + grown)
        } else {
            (self.heap_length, grown)
        };
        self.heap_length = new_length;

        let block = Block::new(self.fresh_handle(), offset, length);
        trace!(offset, length, heap_length = self.heap_length, "grew address space");
        self.free.push(block);
        Ok(block)
    }

    /// Splits an over-sized free block, carving the low `length` bytes out as
    /// the returned block. The remainder stays in the free set under a fresh
    /// identity; the returned block belongs to nobody until the caller
    /// registers it.
    ///
    /// # Errors
    ///
    /// [`Error::BlockTooSmall`] unless the block is strictly longer than the
    /// requested length, [`Error::InvalidHandle`] if it is not a member of
    /// the free set.
    pub fn fragment(&mut self, block: Block, length: u64) -> Result<Block> {
        if block.length() <= length {
            return Err(Error::BlockTooSmall {
                requested: length,
                available: block.length(),
            });
        }
        if !self.free.iter().any(|free| free.handle() == block.handle()) {
            return Err(Error::InvalidHandle(block.handle()));
        }
        self.remove_free(block.handle());

        let carved = Block::new(self.fresh_handle(), block.offset(), length);
        let remainder = Block::new(
            self.fresh_handle(),
            block.offset() + length,
            block.length() - length,
        );
        self.free.push(remainder);
        Ok(carved)
    }

    fn remove_free(&mut self, handle: Handle) {
        let index = self
            .free
            .iter()
            .position(|block| block.handle() == handle)
            .expect("block to remove must be a member of the free set");
        self.free.swap_remove(index);
    }

    fn fresh_handle(&mut self) -> Handle {
        self.next_handle += 1;
        Handle::from_raw(self.next_handle)
    }
}
