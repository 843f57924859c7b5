//! File entry records: encoding, decoding and the load-time scan over the block map.
//!
//! Record layout, from the start of the entry block:
//! - name: MAX_FILE_NAME_LEN bytes, zero padded
//! - size: u32 little endian
//! - block ids: ceil(size / block_size) entries of u32 little endian

use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::block_io::write_exact;
use crate::config::*;
use crate::error::FsError;
use crate::{BlockDevice, BlockType, FileEntry, Result, SuperBlock};

pub fn trim_zero(name: &[u8]) -> &[u8] {
    let mut end = name.len();
    while end > 0 && name[end - 1] == 0 {
        end -= 1;
    }
    &name[..end]
}

impl FileEntry {
    pub fn name_eq(&self, name: &[u8]) -> bool {
        self.name() == trim_zero(name)
    }

    pub fn name_eq_str(&self, name: &str) -> bool {
        self.name_eq(name.as_bytes())
    }
}

fn corrupted(block_id: u32, detail: impl Into<String>) -> FsError {
    FsError::CorruptedEntry {
        block_id,
        detail: detail.into(),
    }
}

pub(crate) fn encode_file_entry(entry: &FileEntry) -> Vec<u8> {
    let mut buf = Vec::with_capacity(entry.record_len());
    buf.extend_from_slice(&entry.name);
    buf.extend_from_slice(&entry.size.to_le_bytes());
    for id in &entry.block_ids {
        buf.extend_from_slice(&id.to_le_bytes());
    }
    buf
}

/// Decodes a record from the raw bytes of its entry block.
pub(crate) fn decode_file_entry(
    superblock: &SuperBlock,
    block_id: u32,
    block: &[u8],
) -> Result<FileEntry> {
    if block.len() < FILE_ENTRY_FIXED_LEN {
        return Err(corrupted(block_id, "entry block is shorter than a record"));
    }
    let mut name = [0u8; MAX_FILE_NAME_LEN];
    name.copy_from_slice(&block[..MAX_FILE_NAME_LEN]);
    let size_bytes = &block[MAX_FILE_NAME_LEN..FILE_ENTRY_FIXED_LEN];
    let size = u32::from_le_bytes([size_bytes[0], size_bytes[1], size_bytes[2], size_bytes[3]]);

    let num_blocks = superblock.blocks_for(size);
    let record_len = FileEntry::record_len_for(num_blocks);
    if record_len > block.len() {
        return Err(corrupted(
            block_id,
            format!("size {} needs {} block ids, more than one block holds", size, num_blocks),
        ));
    }
    let block_ids = block[FILE_ENTRY_FIXED_LEN..record_len]
        .chunks_exact(BLOCK_ID_LEN)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok(FileEntry {
        name,
        size,
        metadata_block_id: block_id,
        block_ids,
    })
}

/// Checks a record against the block map: it must sit in a FileEntry block,
/// fit inside that block, carry exactly enough data blocks for its size,
/// and only reference blocks tagged Data.
pub fn check_file_entry(superblock: &SuperBlock, entry: &FileEntry) -> Result<()> {
    let id = entry.metadata_block_id;
    if superblock.block_type(id) != Some(BlockType::FileEntry) {
        return Err(corrupted(id, "record block is not tagged as a file entry"));
    }
    if entry.name().is_empty() || entry.name().contains(&0) {
        return Err(corrupted(id, "invalid file name"));
    }
    if entry.record_len() > superblock.block_size as usize {
        return Err(corrupted(id, "record does not fit in one block"));
    }
    let expected = superblock.blocks_for(entry.size);
    if entry.block_ids.len() != expected {
        return Err(corrupted(
            id,
            format!(
                "size {} needs {} data blocks, record lists {}",
                entry.size,
                expected,
                entry.block_ids.len()
            ),
        ));
    }
    for &data_id in &entry.block_ids {
        if superblock.block_type(data_id) != Some(BlockType::Data) {
            return Err(corrupted(
                id,
                format!("block {} is not an allocated data block", data_id),
            ));
        }
    }
    Ok(())
}

/// Records every data block of `entry` in `owners` (data block -> entry block).
/// Fails if another record already listed one of them.
pub fn claim_data_blocks(owners: &mut HashMap<u32, u32>, entry: &FileEntry) -> Result<()> {
    let block_id = entry.metadata_block_id;
    if let Some((&data_id, &owner)) = entry
        .block_ids
        .iter()
        .find_map(|id| owners.get_key_value(id))
    {
        return Err(corrupted(
            block_id,
            format!("data block {} is also claimed by entry block {}", data_id, owner),
        ));
    }
    for (i, &data_id) in entry.block_ids.iter().enumerate() {
        if entry.block_ids[..i].contains(&data_id) {
            return Err(corrupted(
                block_id,
                format!("data block {} is listed twice", data_id),
            ));
        }
        owners.insert(data_id, block_id);
    }
    Ok(())
}

/// Everything `write_file_entry` checks, without touching the device.
pub fn check_writable_entry(superblock: &SuperBlock, entry: &FileEntry) -> Result<()> {
    if entry.metadata_block_id >= superblock.block_count {
        return Err(FsError::InvalidBlockId(entry.metadata_block_id));
    }
    if entry.record_len() > superblock.block_size as usize {
        return Err(FsError::FileTooLarge);
    }
    check_file_entry(superblock, entry)
}

/// Writes a record at the start of its entry block.
pub fn write_file_entry(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    entry: &FileEntry,
) -> Result<()> {
    check_writable_entry(superblock, entry)?;
    let buf = encode_file_entry(entry);
    write_exact(device, superblock.block_offset(entry.metadata_block_id), &buf)
}

/// Reads the record stored in entry block `block_id`.
pub fn read_file_entry(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
    block_id: u32,
) -> Result<FileEntry> {
    if block_id >= superblock.block_count {
        return Err(FsError::InvalidBlockId(block_id));
    }
    let mut block = vec![0u8; superblock.block_size as usize];
    if device.read_at(superblock.block_offset(block_id), &mut block)? != block.len() {
        return Err(corrupted(block_id, "entry block is truncated"));
    }
    decode_file_entry(superblock, block_id, &block)
}

/// Rebuilds every record by scanning the block map for FileEntry tags.
/// Each record is validated, and no data block or name may be claimed twice.
pub fn scan_file_entries(
    device: &impl BlockDevice,
    superblock: &SuperBlock,
) -> Result<BTreeMap<u32, FileEntry>> {
    let mut files = BTreeMap::new();
    let mut owners: HashMap<u32, u32> = HashMap::new();

    for (i, &block_type) in superblock.block_map.iter().enumerate() {
        if block_type != BlockType::FileEntry {
            continue;
        }
        let block_id = i as u32;
        let entry = read_file_entry(device, superblock, block_id)?;
        check_file_entry(superblock, &entry)?;
        claim_data_blocks(&mut owners, &entry)?;
        if files.values().any(|f: &FileEntry| f.name_eq(entry.name())) {
            return Err(corrupted(
                block_id,
                format!("duplicate file name \"{}\"", entry.name_lossy()),
            ));
        }
        debug!("loaded {}", entry);
        files.insert(block_id, entry);
    }

    Ok(files)
}
