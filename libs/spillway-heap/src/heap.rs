use std::io;

use tracing::trace;

use crate::{
    block::Block,
    error::{Error, Result},
    handle::Handle,
    manager::HeapManager,
    medium::{FileMedium, Medium, MemoryMedium},
};

/// A [`HeapManager`] bound to a concrete byte [`Medium`].
///
/// The heap performs no caching and no reordering: every `read` and `write`
/// goes straight to the medium, and writes are visible to subsequent reads on
/// the same handle.
#[derive(Debug)]
pub struct Heap<M> {
    manager: HeapManager,
    medium: M,
}

impl Heap<MemoryMedium> {
    /// Heap over a resizable in-memory buffer.
    #[must_use]
    pub fn in_memory(block_size: u64) -> Self {
        Self::new(MemoryMedium::new(), block_size)
    }
}

impl Heap<FileMedium> {
    /// Heap over a scratch file in the system temp directory. The file is
    /// deleted when the heap is disposed or dropped.
    pub fn temporary(block_size: u64) -> Result<Self> {
        Ok(Self::new(FileMedium::temporary()?, block_size))
    }
}

impl<M: Medium> Heap<M> {
    /// Binds a fresh manager to the given medium.
    pub fn new(medium: M, block_size: u64) -> Self {
        Self {
            manager: HeapManager::new(block_size),
            medium,
        }
    }

    /// Read-only view of the allocator bookkeeping.
    #[must_use]
    pub const fn manager(&self) -> &HeapManager {
        &self.manager
    }

    /// Allocates `length` bytes, growing the medium first whenever the
    /// manager has to extend the address space, so the block is usable the
    /// moment its handle is returned.
    pub fn allocate(&mut self, length: u64) -> Result<Handle> {
        if self.manager.find_free_block(length).is_none() {
            self.manager.create_free_block(length)?;
            self.medium.set_length(self.manager.heap_length())?;
            trace!(length = self.manager.heap_length(), "extended heap medium");
        }
        self.manager.allocate(length)
    }

    /// Reads the full contents of the block behind `handle`.
    ///
    /// Short reads are retried until the block is complete; running out of
    /// medium first is [`Error::UnexpectedEndOfStream`].
    pub fn read(&mut self, handle: Handle) -> Result<Vec<u8>> {
        let block = self.manager.allocated_block(handle)?;
        self.medium.set_position(block.offset())?;

        let length = usize::try_from(block.length())
            .map_err(|_| io::Error::from(io::ErrorKind::OutOfMemory))?;
        let mut bytes = vec![0_u8; length];
        let mut filled = 0;
        while filled < bytes.len() {
            let transferred = self.medium.read(&mut bytes[filled..])?;
            if transferred == 0 {
                return Err(Error::UnexpectedEndOfStream {
                    offset: block.offset(),
                    expected: block.length(),
                    read: filled as u64,
                });
            }
            filled += transferred;
        }
        Ok(bytes)
    }

    /// Writes `bytes` over the block behind `handle`. The buffer must match
    /// the block length exactly.
    pub fn write(&mut self, handle: Handle, bytes: &[u8]) -> Result<()> {
        let block = self.manager.allocated_block(handle)?;
        if bytes.len() as u64 != block.length() {
            return Err(Error::LengthMismatch {
                handle,
                expected: block.length(),
                actual: bytes.len() as u64,
            });
        }
        self.medium.set_position(block.offset())?;
        self.medium.write(bytes)
    }

    /// Frees the block behind `handle`. The handle is invalid afterwards.
    pub fn free(&mut self, handle: Handle) -> Result<()> {
        self.manager.free(handle)
    }

    /// Looks up the block behind an allocated handle.
    pub fn allocated_block(&self, handle: Handle) -> Result<Block> {
        self.manager.allocated_block(handle)
    }

    /// Closes the medium. A temporary file medium deletes its file here.
    pub fn dispose(mut self) -> Result<()> {
        self.medium.close()
    }
}
