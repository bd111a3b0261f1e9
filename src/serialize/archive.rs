use std::string::FromUtf8Error;

use thiserror::Error;

use crate::Entity;

/// The most elements reserved up front for a length read from an archive.
///
/// Lengths come from untrusted data. Anything past this grows as elements are
/// actually read, so a corrupt length runs out of bytes instead of memory.
pub const MAX_PREALLOCATION: usize = 4096;

/// Whether an [`Archive`] is being read from or written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveMode {
    /// Values are read out of the archive.
    Read,
    /// Values are written into the archive.
    Write,
}

/// An ordered stream of bytes with a fixed direction.
///
/// The same [`Persist`](super::Persist) code runs in both directions, so reads
/// must happen in exactly the order the writes did.
pub trait Archive {
    /// The direction of this archive.
    fn mode(&self) -> ArchiveMode;

    /// Appends bytes to the archive.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ArchiveError>;

    /// Fills `buf` with the next bytes of the archive.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), ArchiveError>;

    /// Returns `true` if values are being read.
    fn is_read_mode(&self) -> bool {
        self.mode() == ArchiveMode::Read
    }

    /// Writes a little-endian `u64`.
    fn write_u64(&mut self, value: u64) -> Result<(), ArchiveError> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Reads a little-endian `u64`.
    fn read_u64(&mut self) -> Result<u64, ArchiveError> {
        let mut buf = [0; 8];

        self.read_bytes(&mut buf)?;

        Ok(u64::from_le_bytes(buf))
    }

    /// Writes a length or count.
    fn write_len(&mut self, len: usize) -> Result<(), ArchiveError> {
        self.write_u64(len as u64)
    }

    /// Reads a length or count.
    fn read_len(&mut self) -> Result<usize, ArchiveError> {
        let len = self.read_u64()?;

        usize::try_from(len).map_err(|_| ArchiveError::LengthOverflow(len))
    }

    /// Reads `len` bytes into a new buffer, in chunks of at most
    /// [`MAX_PREALLOCATION`] bytes.
    fn read_byte_vec(&mut self, len: usize) -> Result<Vec<u8>, ArchiveError> {
        let mut bytes = Vec::with_capacity(len.min(MAX_PREALLOCATION));
        let mut chunk = [0; MAX_PREALLOCATION];

        while bytes.len() < len {
            let size = (len - bytes.len()).min(MAX_PREALLOCATION);

            self.read_bytes(&mut chunk[..size])?;
            bytes.extend_from_slice(&chunk[..size]);
        }

        Ok(bytes)
    }
}

/// An [`Archive`] backed by a byte buffer in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryArchive {
    data: Vec<u8>,
    cursor: usize,
    mode: ArchiveMode,
}

/// An error while reading or writing an [`Archive`].
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive ended before a value was fully read.
    #[error("unexpected end of archive: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// The amount of bytes the read needed.
        needed: usize,
        /// The amount of bytes left in the archive.
        remaining: usize,
    },
    /// The archive was used in the wrong direction.
    #[error("archive is not in {expected:?} mode")]
    WrongMode {
        /// The mode the operation required.
        expected: ArchiveMode,
    },
    /// A length doesn't fit in `usize`.
    #[error("length {0} does not fit in memory")]
    LengthOverflow(u64),
    /// A persisted entity doesn't fit in 32 bits.
    #[error("persisted entity {0} is out of range")]
    EntityOverflow(u64),
    /// A persisted store owned the null entity, or the same entity twice.
    #[error("persisted store has an invalid or duplicate owner: {0:?}")]
    InvalidStoreEntity(Entity),
    /// A `bool` wasn't stored as `0` or `1`.
    #[error("invalid bool byte: {0:#04x}")]
    InvalidBool(u8),
    /// A string wasn't valid UTF-8.
    #[error(transparent)]
    InvalidUtf8(#[from] FromUtf8Error),
}

impl MemoryArchive {
    /// Creates an empty archive to write into.
    pub const fn writer() -> Self {
        Self { data: Vec::new(), cursor: 0, mode: ArchiveMode::Write }
    }

    /// Creates an archive that reads `data` from the start.
    pub fn reader(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into(), cursor: 0, mode: ArchiveMode::Read }
    }

    /// Turns a written archive into one reading the same bytes.
    pub fn into_reader(self) -> Self {
        Self::reader(self.data)
    }

    /// The bytes in the archive.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the archive, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// The amount of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }
}

impl Archive for MemoryArchive {
    fn mode(&self) -> ArchiveMode {
        self.mode
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ArchiveError> {
        if self.mode != ArchiveMode::Write {
            return Err(ArchiveError::WrongMode { expected: ArchiveMode::Write });
        }

        self.data.extend_from_slice(bytes);

        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), ArchiveError> {
        if self.mode != ArchiveMode::Read {
            return Err(ArchiveError::WrongMode { expected: ArchiveMode::Read });
        }

        let remaining = self.remaining();
        let needed = buf.len();

        if needed > remaining {
            return Err(ArchiveError::UnexpectedEof { needed, remaining });
        }

        buf.copy_from_slice(&self.data[self.cursor..self.cursor + needed]);
        self.cursor += needed;

        Ok(())
    }
}
