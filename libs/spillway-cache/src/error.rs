use thiserror::Error as ThisError;

/// Convenient alias, which defaults to [`Error`] as [`Err`]-variant.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error variants returned by this crate.
#[derive(ThisError, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Key is already present: {0}")]
    DuplicateKey(String),

    #[error("Buffer is empty")]
    Empty,

    #[error("Index {index} is out of range for {len} elements")]
    OutOfRange { index: usize, len: usize },

    #[error("Buffer has zero capacity")]
    ZeroCapacity,

    #[error("Heap error: {0}")]
    Heap(#[from] spillway_heap::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Stored bytes are not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
