use std::{
    env,
    fmt,
    fs::{self, File, OpenOptions},
    io::{self, Read as _, Seek as _, SeekFrom, Write as _},
    path::{Path, PathBuf},
};

use tracing::trace;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Capability contract for the byte store behind a [`Heap`](crate::Heap).
///
/// A medium is a random-access sequence of bytes. Short reads are permitted
/// (callers loop); short writes are not. `set_length` beyond the current
/// length appends bytes whose contents are unobservable until written.
pub trait Medium {
    /// Moves the read/write cursor to an absolute offset.
    fn set_position(&mut self, position: u64) -> Result<()>;

    /// Reads up to `buf.len()` bytes at the cursor, returning how many were
    /// transferred. Zero means end-of-medium.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Writes the whole buffer at the cursor.
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Grows or truncates the medium to exactly `length` bytes.
    fn set_length(&mut self, length: u64) -> Result<()>;

    /// Current length in bytes.
    fn length(&self) -> Result<u64>;

    /// Releases the medium. Idempotent; operations other than `close` fail
    /// with [`Error::MediumClosed`] afterwards. A medium that owns its
    /// backing file deletes it here.
    fn close(&mut self) -> Result<()>;
}

/// Resizable in-memory byte buffer.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    bytes: Vec<u8>,
    position: u64,
}

impl MemoryMedium {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Medium for MemoryMedium {
    fn set_position(&mut self, position: u64) -> Result<()> {
        self.position = position;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let position = usize::try_from(self.position)
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        let available = self.bytes.len().saturating_sub(position);
        let transferred = buf.len().min(available);
        buf[..transferred].copy_from_slice(&self.bytes[position..position + transferred]);
        self.position += transferred as u64;
        Ok(transferred)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        let position = usize::try_from(self.position)
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        let end = position
            .checked_add(buf.len())
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| io::Error::from(io::ErrorKind::WriteZero))?;
        self.bytes[position..end].copy_from_slice(buf);
        self.position = end as u64;
        Ok(())
    }

    fn set_length(&mut self, length: u64) -> Result<()> {
        let length =
            usize::try_from(length).map_err(|_| io::Error::from(io::ErrorKind::OutOfMemory))?;
        self.bytes.resize(length, 0);
        Ok(())
    }

    fn length(&self) -> Result<u64> {
        Ok(self.bytes.len() as u64)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Identifier for a temporary heap file.
///
/// Holds a UUID; the `Display` form is the file stem, so concurrently created
/// heaps cannot collide on a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapId(Uuid);

impl HeapId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Path of the backing file inside the system temp directory.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        env::temp_dir().join(format!("{self}.heap"))
    }
}

impl Default for HeapId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HeapId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "spillway_{}", self.0.as_simple())
    }
}

/// Random-access file medium.
///
/// Created through [`FileMedium::temporary`] the medium owns its file and
/// deletes it on [`close`](Medium::close) (and on drop, along all exit
/// paths). Created through [`FileMedium::at_path`] the file outlives the
/// medium. The drop decision is carried here, not threaded through every
/// operation.
#[derive(Debug)]
pub struct FileMedium {
    file: Option<File>,
    path: PathBuf,
    delete_on_close: bool,
}

impl FileMedium {
    /// Creates a fresh scratch file named after a [`HeapId`] in the system
    /// temp directory, retrying on the (unlikely) name collision. The file is
    /// deleted when the medium is closed or dropped.
    pub fn temporary() -> Result<Self> {
        loop {
            let id = HeapId::new();
            let path = id.path();
            match OpenOptions::new()
                .read(true)
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => {
                    trace!(path = %path.display(), "created temporary heap file");
                    return Ok(Self {
                        file: Some(file),
                        path,
                        delete_on_close: true,
                    });
                }
                Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {}
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Opens (or creates) a heap file at a caller-chosen path. The file is
    /// left behind on close; the caller owns its lifetime.
    pub fn at_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self {
            file: Some(file),
            path,
            delete_on_close: false,
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&self) -> Result<&File> {
        self.file.as_ref().ok_or(Error::MediumClosed)
    }

    fn file_mut(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(Error::MediumClosed)
    }
}

impl Medium for FileMedium {
    fn set_position(&mut self, position: u64) -> Result<()> {
        self.file_mut()?.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.file_mut()?.read(buf)?)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.file_mut()?.write_all(buf)?;
        Ok(())
    }

    fn set_length(&mut self, length: u64) -> Result<()> {
        self.file()?.set_len(length)?;
        Ok(())
    }

    fn length(&self) -> Result<u64> {
        Ok(self.file()?.metadata()?.len())
    }

    fn close(&mut self) -> Result<()> {
        if self.file.take().is_some() && self.delete_on_close {
            trace!(path = %self.path.display(), "deleting temporary heap file");
            match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => return Err(error.into()),
            }
        }
        Ok(())
    }
}

impl Drop for FileMedium {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            trace!(path = %self.path.display(), %error, "failed to clean up heap file");
        }
    }
}
