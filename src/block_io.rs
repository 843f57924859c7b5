//! Block store: byte ranges addressed as (block, offset inside the block, length).
//! An access never crosses a block boundary.

use std::io;

use log::debug;

use crate::error::FsError;
use crate::{BlockDevice, Result, SuperBlock};

fn check_region(superblock: &SuperBlock, block_id: u32, block_offset: usize, len: usize) -> Result<()> {
    if block_id >= superblock.block_count {
        return Err(FsError::InvalidBlockId(block_id));
    }
    let block_size = superblock.block_size as usize;
    if block_offset >= block_size || len > block_size - block_offset {
        return Err(FsError::OutOfBounds {
            block_id,
            offset: block_offset,
            len,
        });
    }
    Ok(())
}

/// Writes `buf` into block `block_id` starting `block_offset` bytes into the block.
/// Returns the number of bytes written.
pub fn write_block_region(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    block_id: u32,
    block_offset: usize,
    buf: &[u8],
) -> Result<usize> {
    check_region(superblock, block_id, block_offset, buf.len())?;
    let written = device.write_at(
        superblock.block_offset(block_id) + block_offset as u64,
        buf,
    )?;
    debug!("write block {} offset {}: {} bytes", block_id, block_offset, written);
    Ok(written)
}

/// Reads `buf.len()` bytes from block `block_id` starting `block_offset` bytes into the block.
/// Returns the number of bytes read, which is short only if the image is truncated.
pub fn read_block_region(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    block_id: u32,
    block_offset: usize,
    buf: &mut [u8],
) -> Result<usize> {
    check_region(superblock, block_id, block_offset, buf.len())?;
    let read = device.read_at(
        superblock.block_offset(block_id) + block_offset as u64,
        buf,
    )?;
    debug!("read block {} offset {}: {} bytes", block_id, block_offset, read);
    Ok(read)
}

/// Writes all of `buf` at `offset`, turning a short write into an error.
pub(crate) fn write_exact(device: &impl BlockDevice, offset: u64, buf: &[u8]) -> Result<()> {
    let written = device.write_at(offset, buf)?;
    if written != buf.len() {
        return Err(FsError::Io(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("short write at offset {}: {} of {} bytes", offset, written, buf.len()),
        )));
    }
    Ok(())
}
