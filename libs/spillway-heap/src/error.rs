use std::io;

use thiserror::Error as ThisError;

use crate::handle::Handle;

/// Convenient alias, which defaults to [`Error`] as [`Err`]-variant.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error variants returned by this crate.
#[derive(ThisError, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Handle {0} does not refer to an allocated block")]
    InvalidHandle(Handle),

    #[error("Free block of {available} bytes cannot be fragmented into {requested} bytes")]
    BlockTooSmall { requested: u64, available: u64 },

    #[error("Heap of {length} bytes cannot grow by {requested} more bytes")]
    OutOfAddressSpace { length: u64, requested: u64 },

    #[error(
        "Buffer of {actual} bytes does not match the {expected} byte block behind handle {handle}"
    )]
    LengthMismatch {
        handle: Handle,
        expected: u64,
        actual: u64,
    },

    #[error("Medium ended after {read} of {expected} bytes at offset {offset}")]
    UnexpectedEndOfStream { offset: u64, expected: u64, read: u64 },

    #[error("Medium has already been closed")]
    MediumClosed,

    #[error("Medium I/O error: {0}")]
    Io(#[from] io::Error),
}
