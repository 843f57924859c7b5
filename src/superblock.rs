//! The header in block 0: block size, block count and the block-type map.

use crate::block_io::write_exact;
use crate::config::*;
use crate::error::FsError;
use crate::{BlockDevice, BlockType, Result, SuperBlock};

fn invalid(detail: impl Into<String>) -> FsError {
    FsError::InvalidSuperBlock(detail.into())
}

pub fn read_superblock(device: &impl BlockDevice) -> Result<SuperBlock> {
    let mut fixed = [0u8; HEADER_FIXED_LEN];
    if device.read_at(0, &mut fixed)? != HEADER_FIXED_LEN {
        return Err(invalid("image is shorter than the header"));
    }
    let block_size = u32::from_le_bytes([fixed[0], fixed[1], fixed[2], fixed[3]]);
    let block_count = u32::from_le_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]);

    // Check everything the header claims before sizing anything after it.
    if !SuperBlock::geometry_fits(block_size, block_count) {
        return Err(invalid(format!(
            "unusable geometry: block size {}, block count {}",
            block_size, block_count
        )));
    }
    let expected_len = block_size as u64 * block_count as u64;
    let actual_len = device.size()?;
    if actual_len != expected_len {
        return Err(invalid(format!(
            "image is {} bytes, header describes {}",
            actual_len, expected_len
        )));
    }

    let mut superblock = SuperBlock::new(block_size, block_count)?;
    let mut tags = vec![0u8; block_count as usize];
    if device.read_at(HEADER_FIXED_LEN as u64, &mut tags)? != tags.len() {
        return Err(invalid("block map is truncated"));
    }
    for (i, &tag) in tags.iter().enumerate() {
        superblock.block_map[i] = BlockType::try_from(tag)
            .map_err(|_| invalid(format!("block {} has unknown tag {:#04x}", i, tag)))?;
    }
    if superblock.block_map[SUPERBLOCK_ID as usize] != BlockType::Metadata {
        return Err(invalid("block 0 is not tagged as metadata"));
    }

    Ok(superblock)
}

pub fn write_superblock(device: &impl BlockDevice, superblock: &SuperBlock) -> Result<()> {
    debug_assert_eq!(superblock.block_map.len(), superblock.block_count as usize);
    let mut buf = Vec::with_capacity(superblock.header_len());
    buf.extend_from_slice(&superblock.block_size.to_le_bytes());
    buf.extend_from_slice(&superblock.block_count.to_le_bytes());
    buf.extend(superblock.block_map.iter().map(|&t| u8::from(t)));
    write_exact(device, 0, &buf)
}
