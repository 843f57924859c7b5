use core::fmt;
use std::borrow::Cow;

use crate::config::*;
use crate::directory::trim_zero;
use crate::Error;
use crate::Result;

/// In-memory copy of block 0: geometry plus the block-type map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    pub block_size: u32,     // Bytes per block, fixed at format time
    pub block_count: u32,    // Total number of blocks in the image
    pub block_map: Vec<BlockType>, // One tag per block, always block_count long
}

impl SuperBlock {
    /// Creates a superblock with every block Empty except block 0, which holds the header.
    pub fn new(block_size: u32, block_count: u32) -> Result<Self> {
        if !Self::geometry_fits(block_size, block_count) {
            return Err(Error::InvalidGeometry { block_size, block_count });
        }
        let mut block_map = vec![BlockType::Empty; block_count as usize];
        block_map[SUPERBLOCK_ID as usize] = BlockType::Metadata;
        Ok(Self {
            block_size,
            block_count,
            block_map,
        })
    }

    /// Both values must be positive and the header must fit inside block 0.
    pub fn geometry_fits(block_size: u32, block_count: u32) -> bool {
        block_size > 0
            && block_count > 0
            && HEADER_FIXED_LEN + block_count as usize <= block_size as usize
    }

    /// Length of the on-disk header: fixed fields followed by one tag byte per block.
    pub fn header_len(&self) -> usize {
        HEADER_FIXED_LEN + self.block_count as usize
    }

    pub fn image_len(&self) -> u64 {
        self.block_size as u64 * self.block_count as u64
    }

    /// Byte offset of the start of `block_id` inside the image.
    pub fn block_offset(&self, block_id: u32) -> u64 {
        block_id as u64 * self.block_size as u64
    }

    /// Number of data blocks needed to hold `size` bytes.
    pub fn blocks_for(&self, size: u32) -> usize {
        (size as usize).div_ceil(self.block_size as usize)
    }

    pub fn free_blocks(&self) -> usize {
        self.block_map
            .iter()
            .filter(|&&t| t == BlockType::Empty)
            .count()
    }

    pub fn block_type(&self, block_id: u32) -> Option<BlockType> {
        self.block_map.get(block_id as usize).copied()
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Empty = 0,
    Metadata = 1,
    FileEntry = 2,
    Data = 3,
}

impl TryFrom<u8> for BlockType {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(BlockType::Empty),
            1 => Ok(BlockType::Metadata),
            2 => Ok(BlockType::FileEntry),
            3 => Ok(BlockType::Data),
            _ => Err(Error::InvalidBlockType(tag)),
        }
    }
}

impl From<BlockType> for u8 {
    fn from(block_type: BlockType) -> u8 {
        block_type as u8
    }
}

/// Directory entry of one file, stored at the start of its own entry block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: [u8; MAX_FILE_NAME_LEN],
    pub size: u32,              // Logical length of the content in bytes
    pub metadata_block_id: u32, // Block holding this record
    pub block_ids: Vec<u32>,    // Data blocks in content order
}

impl FileEntry {
    pub fn new(metadata_block_id: u32, name: &[u8]) -> Result<Self> {
        if name.is_empty() || name.len() > MAX_FILE_NAME_LEN || name.contains(&0) {
            return Err(Error::InvalidFileName);
        }
        Ok(Self {
            name: {
                let mut arr = [0; MAX_FILE_NAME_LEN];
                arr[..name.len()].copy_from_slice(name);
                arr
            },
            size: 0,
            metadata_block_id,
            block_ids: Vec::new(),
        })
    }

    /// Name without the zero padding.
    pub fn name(&self) -> &[u8] {
        trim_zero(&self.name)
    }

    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name())
    }

    /// Serialized length of this record.
    pub fn record_len(&self) -> usize {
        Self::record_len_for(self.block_ids.len())
    }

    pub fn record_len_for(num_blocks: usize) -> usize {
        FILE_ENTRY_FIXED_LEN + num_blocks * BLOCK_ID_LEN
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "File \"{}\" ({} bytes, entry block {}) blocks: {:?}",
            self.name_lossy(),
            self.size,
            self.metadata_block_id,
            self.block_ids
        )
    }
}
