//! File content access through a record's data blocks.
//! Content never touches the entry block; only `size` and `block_ids` change here,
//! and they reach the disk on the next save.

use std::io;

use crate::block_io::{read_block_region, write_block_region};
use crate::block_map::{alloc_block, check_freeable, free_block};
use crate::{BlockDevice, BlockType, Error, FileEntry, Result, SuperBlock};

/// Data block holding byte `offset` of the file.
fn block_at(entry: &FileEntry, block_size: usize, offset: usize) -> Result<u32> {
    entry
        .block_ids
        .get(offset / block_size)
        .copied()
        .ok_or_else(|| Error::CorruptedEntry {
            block_id: entry.metadata_block_id,
            detail: format!("no data block listed for byte {}", offset),
        })
}

/// Reads file content starting at `offset` into `buffer`.
/// Returns the number of bytes read, 0 at or past the end of the file.
pub(crate) fn fread(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    entry: &FileEntry,
    offset: usize,
    buffer: &mut [u8],
) -> Result<usize> {
    let size = entry.size as usize;
    if offset >= size || buffer.is_empty() {
        return Ok(0);
    }

    let block_size = superblock.block_size as usize;
    let len = buffer.len().min(size - offset);
    let mut bytes_read = 0;

    while bytes_read < len {
        let current_offset = offset + bytes_read;
        let block_id = block_at(entry, block_size, current_offset)?;
        let start_offset = current_offset % block_size;
        let bytes_to_read = (block_size - start_offset).min(len - bytes_read);

        let n = read_block_region(
            device,
            superblock,
            block_id,
            start_offset,
            &mut buffer[bytes_read..bytes_read + bytes_to_read],
        )?;
        if n != bytes_to_read {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("data block {} is truncated", block_id),
            )));
        }
        bytes_read += n;
    }

    Ok(bytes_read)
}

/// Writes `buffer` into the file at `offset`, allocating data blocks as needed.
/// `offset` may not lie past the current end of the file.
/// Returns the number of bytes written.
pub(crate) fn fwrite(
    device: &impl BlockDevice,
    superblock: &mut SuperBlock,
    entry: &mut FileEntry,
    offset: usize,
    buffer: &[u8],
) -> Result<usize> {
    if offset > entry.size as usize {
        return Err(Error::InvalidArgument("write would leave a hole in the file"));
    }
    if buffer.is_empty() {
        return Ok(0);
    }

    let end = offset + buffer.len();
    if end > u32::MAX as usize {
        return Err(Error::FileTooLarge);
    }
    let block_size = superblock.block_size as usize;
    let needed = end.div_ceil(block_size);
    if needed > entry.block_ids.len() && FileEntry::record_len_for(needed) > block_size {
        return Err(Error::FileTooLarge);
    }

    // Grab every missing block first so a full disk leaves the file as it was.
    let mut fresh = Vec::new();
    while entry.block_ids.len() + fresh.len() < needed {
        match alloc_block(superblock, BlockType::Data) {
            Ok(block_id) => fresh.push(block_id),
            Err(e) => {
                for block_id in fresh {
                    free_block(superblock, block_id)?;
                }
                return Err(e);
            }
        }
    }
    let old_len = entry.block_ids.len();
    entry.block_ids.extend(fresh);

    let bytes_written = match write_span(device, superblock, &entry.block_ids, offset, buffer) {
        Ok(n) => n,
        Err(e) => {
            for block_id in entry.block_ids.drain(old_len..) {
                free_block(superblock, block_id)?;
            }
            return Err(e);
        }
    };

    if end > entry.size as usize {
        entry.size = end as u32;
    }

    Ok(bytes_written)
}

fn write_span(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    block_ids: &[u32],
    offset: usize,
    buffer: &[u8],
) -> Result<usize> {
    let block_size = superblock.block_size as usize;
    let mut bytes_written = 0;
    while bytes_written < buffer.len() {
        let current_offset = offset + bytes_written;
        let block_id = block_ids[current_offset / block_size];
        let start_offset = current_offset % block_size;
        let bytes_to_write = (block_size - start_offset).min(buffer.len() - bytes_written);

        bytes_written += write_block_region(
            device,
            superblock,
            block_id,
            start_offset,
            &buffer[bytes_written..bytes_written + bytes_to_write],
        )?;
    }
    Ok(bytes_written)
}

/// Releases every data block of the file and empties it.
/// Nothing changes unless every block can be freed.
pub(crate) fn ftruncate(superblock: &mut SuperBlock, entry: &mut FileEntry) -> Result<()> {
    for &block_id in &entry.block_ids {
        check_freeable(superblock, block_id)?;
    }
    for block_id in entry.block_ids.drain(..) {
        free_block(superblock, block_id)?;
    }
    entry.size = 0;
    Ok(())
}
