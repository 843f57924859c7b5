//! Management of the block-type map.
//! The map lives in the superblock and is only changed in memory here;
//! it reaches the disk when the file system is saved.

use log::{debug, warn};

use crate::config::SUPERBLOCK_ID;
use crate::error::FsError;
use crate::{BlockType, Result, SuperBlock};

/// Returns the lowest block id tagged Empty, if any.
pub fn find_empty_block(superblock: &SuperBlock) -> Option<u32> {
    superblock
        .block_map
        .iter()
        .position(|&t| t == BlockType::Empty)
        .map(|i| i as u32)
}

/// Tags the first empty block with `block_type` and returns its id.
/// The map is left untouched when the file system is full.
pub fn alloc_block(superblock: &mut SuperBlock, block_type: BlockType) -> Result<u32> {
    if block_type == BlockType::Empty {
        return Err(FsError::InvalidArgument("cannot allocate a block as Empty"));
    }
    let Some(block_id) = find_empty_block(superblock) else {
        warn!("cannot allocate {:?} block: filesystem is full", block_type);
        return Err(FsError::OutOfSpace);
    };
    superblock.block_map[block_id as usize] = block_type;
    debug!("allocated block {} as {:?}", block_id, block_type);
    Ok(block_id)
}

/// Returns an allocated block to the free pool.
/// Returns the tag the block carried before.
pub fn free_block(superblock: &mut SuperBlock, block_id: u32) -> Result<BlockType> {
    check_freeable(superblock, block_id)?;
    let prev = core::mem::replace(&mut superblock.block_map[block_id as usize], BlockType::Empty);
    debug!("freed block {} (was {:?})", block_id, prev);
    Ok(prev)
}

/// Fails exactly when `free_block` would, without changing the map.
pub fn check_freeable(superblock: &SuperBlock, block_id: u32) -> Result<()> {
    if block_id == SUPERBLOCK_ID || block_id >= superblock.block_count {
        return Err(FsError::InvalidBlockId(block_id));
    }
    if superblock.block_map[block_id as usize] == BlockType::Empty {
        return Err(FsError::InvalidArgument("block is not allocated"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fit_skips_used_blocks() {
        let mut sb = SuperBlock::new(64, 8).unwrap();
        for id in [1, 3, 4, 6] {
            sb.block_map[id] = BlockType::Data;
        }
        // Empty blocks are now 2, 5 and 7.
        assert_eq!(find_empty_block(&sb), Some(2));
        assert_eq!(alloc_block(&mut sb, BlockType::Data).unwrap(), 2);
        assert_eq!(find_empty_block(&sb), Some(5));
    }

    #[test]
    fn header_block_cannot_be_freed() {
        let mut sb = SuperBlock::new(64, 8).unwrap();
        assert!(matches!(free_block(&mut sb, 0), Err(FsError::InvalidBlockId(0))));
        assert!(matches!(free_block(&mut sb, 8), Err(FsError::InvalidBlockId(8))));
        assert!(matches!(free_block(&mut sb, 3), Err(FsError::InvalidArgument(_))));
    }
}
