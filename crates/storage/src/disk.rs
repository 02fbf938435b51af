//! BlockFile: fixed-size block I/O on a single file, addressed by byte offset.
//!
//! Invariants:
//! - Every read/write covers exactly one BLOCK_SIZE chunk
//! - The file grows only through append, so every stored block sits at an
//!   offset that is an integer multiple of BLOCK_SIZE
//! - Written blocks are synced to disk before the call returns

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;

use thiserror::Error;

pub const BLOCK_SIZE: usize = 512;

/// Byte offset of a block within its file.
pub type BlockOffset = i64;

/// Sentinel for "no block": empty root, end of leaf chain, unset child.
pub const NO_OFFSET: BlockOffset = -1;

/// Errors returned by the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying file operation failed.
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    /// A block buffer had the wrong length.
    #[error("block buffer must be exactly {BLOCK_SIZE} bytes, got {0}")]
    BadBlockSize(usize),
    /// A block offset pointed outside the file.
    #[error("block offset {offset} outside file of {len} bytes")]
    OffsetOutOfBounds { offset: BlockOffset, len: u64 },
}

/// Convenience alias for storage results.
pub type StorageResult<T> = Result<T, StorageError>;

pub struct BlockFile {
    file: File,
    len: u64, // cached end-of-file, advanced on append
}

impl BlockFile {
    /// Opens (creating if absent) the file for random-access block I/O.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }

    /// Number of bytes currently stored.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends one block at end-of-file; returns the offset it was written at.
    pub fn append(&mut self, block: &[u8]) -> StorageResult<BlockOffset> {
        check_block_size(block)?;
        let offset = self.len;
        self.file.write_all_at(block, offset)?;
        self.file.sync_data()?;
        self.len += BLOCK_SIZE as u64;
        Ok(offset as BlockOffset)
    }

    /// Reads the block at `offset` into `buf`.
    pub fn read(&self, offset: BlockOffset, buf: &mut [u8]) -> StorageResult<()> {
        check_block_size(buf)?;
        let offset = self.check_offset(offset)?;
        self.file.read_exact_at(buf, offset)?;
        Ok(())
    }

    /// Overwrites the block at `offset` in place.
    pub fn overwrite(&mut self, offset: BlockOffset, block: &[u8]) -> StorageResult<()> {
        check_block_size(block)?;
        let offset = self.check_offset(offset)?;
        self.file.write_all_at(block, offset)?;
        self.file.sync_data()?;
        Ok(())
    }

    fn check_offset(&self, offset: BlockOffset) -> StorageResult<u64> {
        if offset < 0 || offset as u64 + BLOCK_SIZE as u64 > self.len {
            return Err(StorageError::OffsetOutOfBounds {
                offset,
                len: self.len,
            });
        }
        Ok(offset as u64)
    }
}

fn check_block_size(buf: &[u8]) -> StorageResult<()> {
    if buf.len() != BLOCK_SIZE {
        return Err(StorageError::BadBlockSize(buf.len()));
    }
    Ok(())
}
