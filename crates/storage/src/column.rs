//! Paged column files.
//!
//! Layout (little-endian): a u64 value count at offset 0, then fixed-size
//! blocks packed front to back with fixed-width values. Record `i` lives in
//! block `i / values_per_block`, slot `i % values_per_block`; trailing bytes
//! of the last block are zero. The selective fetch path reads only the
//! blocks that contain requested records.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::marker::PhantomData;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use crate::codec::FixedWidth;
use crate::disk::{StorageResult, BLOCK_SIZE};

/// Dense row identifier, assigned by bulk insertion order.
pub type RecordId = u32;

const COUNT_HEADER_SIZE: u64 = 8;

/// One on-disk column of fixed-width values.
pub struct ColumnFile<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: FixedWidth> ColumnFile<T> {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// How many values pack into one block for this value type.
    pub const fn values_per_block() -> usize {
        BLOCK_SIZE / T::WIDTH
    }

    /// Stored value count; 0 when the file does not exist yet.
    pub fn count(&self) -> StorageResult<u64> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };
        read_count(&file)
    }

    /// Truncates the file and writes the count header plus all value blocks.
    /// Every block is written as exactly `BLOCK_SIZE` bytes regardless of fill.
    pub fn write_all(&self, values: &[T]) -> StorageResult<()> {
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&(values.len() as u64).to_le_bytes())?;

        let mut block = [0u8; BLOCK_SIZE];
        for chunk in values.chunks(Self::values_per_block()) {
            block.fill(0);
            for (slot, value) in chunk.iter().enumerate() {
                let at = slot * T::WIDTH;
                value.encode(&mut block[at..at + T::WIDTH]);
            }
            writer.write_all(&block)?;
        }
        writer.flush()?;
        writer.get_ref().sync_data()?;
        Ok(())
    }

    /// Reads the whole column back in record order. A missing file is an
    /// empty column.
    pub fn load_all(&self) -> StorageResult<Vec<T>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let count = read_count(&file)? as usize;
        let mut reader = BufReader::new(file);
        let mut skip = [0u8; COUNT_HEADER_SIZE as usize];
        reader.read_exact(&mut skip)?;

        let mut values = Vec::with_capacity(count);
        let mut block = [0u8; BLOCK_SIZE];
        while values.len() < count {
            reader.read_exact(&mut block)?;
            let remaining = count - values.len();
            for slot in 0..Self::values_per_block().min(remaining) {
                let at = slot * T::WIDTH;
                values.push(T::decode(&block[at..at + T::WIDTH]));
            }
        }
        Ok(values)
    }

    /// Selective read: materializes only the blocks containing the requested
    /// records. Out-of-range ids are silently skipped; the output order is
    /// unspecified.
    pub fn fetch(&self, ids: &[RecordId]) -> StorageResult<Vec<(RecordId, T)>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let count = read_count(&file)?;
        let groups = block_groups(ids, count, Self::values_per_block());

        let mut out = Vec::with_capacity(ids.len());
        let mut block = [0u8; BLOCK_SIZE];
        for (block_index, block_ids) in groups {
            let offset = COUNT_HEADER_SIZE + block_index * BLOCK_SIZE as u64;
            file.read_exact_at(&mut block, offset)?;
            for id in block_ids {
                let slot = id as usize % Self::values_per_block();
                let at = slot * T::WIDTH;
                out.push((id, T::decode(&block[at..at + T::WIDTH])));
            }
        }
        Ok(out)
    }
}

fn read_count(file: &File) -> StorageResult<u64> {
    let mut header = [0u8; COUNT_HEADER_SIZE as usize];
    file.read_exact_at(&mut header, 0)?;
    Ok(u64::from_le_bytes(header))
}

/// Groups requested ids by the block they live in, dropping ids at or past
/// `count`. Sorted by block index so reads walk the file forward.
fn block_groups(
    ids: &[RecordId],
    count: u64,
    values_per_block: usize,
) -> BTreeMap<u64, Vec<RecordId>> {
    let mut groups: BTreeMap<u64, Vec<RecordId>> = BTreeMap::new();
    for &id in ids {
        if (id as u64) >= count {
            continue;
        }
        let block_index = id as u64 / values_per_block as u64;
        groups.entry(block_index).or_default().push(id);
    }
    groups
}
