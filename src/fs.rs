use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::block_io::{read_block_region, write_block_region};
use crate::block_map::{alloc_block, check_freeable, find_empty_block, free_block};
use crate::directory::{
    check_file_entry, check_writable_entry, claim_data_blocks, scan_file_entries, write_file_entry,
};
use crate::file::{fread, ftruncate, fwrite};
use crate::{read_superblock, write_superblock, BlockDevice, BlockType, Error, FileEntry, ImageFile, Result, SuperBlock};

/// Handle of one open image: geometry, block map and the known files.
/// Every change stays in memory until [`FileSystem::save`], except file content,
/// which is written straight to its data blocks.
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice> {
    device: Arc<D>,
    superblock: SuperBlock,
    files: BTreeMap<u32, FileEntry>, // Keyed by entry block id
}

impl<D: BlockDevice> FileSystem<D> {
    /// Formats `device` as an empty image of `block_count` blocks of `block_size` bytes.
    /// The backing store is resized to exactly `block_size * block_count` bytes.
    pub fn format(device: Arc<D>, block_size: u32, block_count: u32) -> Result<Self> {
        let superblock = SuperBlock::new(block_size, block_count)?;
        device.reset(superblock.image_len())?;
        write_superblock(&*device, &superblock)?;
        device.flush()?;
        info!(
            "formatted {}: {} blocks of {} bytes",
            device.id(),
            block_count,
            block_size
        );
        Ok(Self {
            device,
            superblock,
            files: BTreeMap::new(),
        })
    }

    /// Rebuilds the handle from the bytes on `device`.
    /// There is nothing to fall back to when this fails, so callers should end the session.
    pub fn load(device: Arc<D>) -> Result<Self> {
        let superblock = read_superblock(&*device)?;
        let files = scan_file_entries(&*device, &superblock)?;
        info!(
            "loaded {}: {} blocks of {} bytes, {} files",
            device.id(),
            superblock.block_count,
            superblock.block_size,
            files.len()
        );
        Ok(Self {
            device,
            superblock,
            files,
        })
    }

    /// Writes the header, the block map and every file record to the device.
    /// File content is not touched.
    /// Every record is checked before the first byte is written, so a failed check leaves the image as it was.
    pub fn save(&self) -> Result<()> {
        let mut owners = HashMap::new();
        for entry in self.files.values() {
            check_writable_entry(&self.superblock, entry)?;
            claim_data_blocks(&mut owners, entry)?;
        }
        write_superblock(&*self.device, &self.superblock)?;
        for entry in self.files.values() {
            write_file_entry(&*self.device, &self.superblock, entry)?;
        }
        self.device.flush()?;
        info!("saved {}: {} files", self.device.id(), self.files.len());
        Ok(())
    }

    // Block level access.

    pub fn find_empty_block(&self) -> Option<u32> {
        find_empty_block(&self.superblock)
    }

    pub fn allocate_block(&mut self, block_type: BlockType) -> Result<u32> {
        alloc_block(&mut self.superblock, block_type)
    }

    /// Blocks still owned by a registered file cannot be freed here;
    /// use `remove_file` or `truncate_file` instead.
    pub fn free_block(&mut self, block_id: u32) -> Result<()> {
        if self.owner_of(block_id).is_some() {
            return Err(Error::InvalidArgument("block belongs to a file"));
        }
        free_block(&mut self.superblock, block_id)?;
        Ok(())
    }

    pub fn write_block_region(&self, block_id: u32, block_offset: usize, buf: &[u8]) -> Result<usize> {
        write_block_region(&*self.device, &self.superblock, block_id, block_offset, buf)
    }

    pub fn read_block_region(&self, block_id: u32, block_offset: usize, buf: &mut [u8]) -> Result<usize> {
        read_block_region(&*self.device, &self.superblock, block_id, block_offset, buf)
    }

    // File records.

    /// Allocates an entry block for a new, empty file and registers it.
    /// Returns the entry block id, which identifies the file from now on.
    pub fn create_file(&mut self, name: &str) -> Result<u32> {
        // Validate before allocating so a bad name does not leak a block.
        FileEntry::new(0, name.as_bytes())?;
        if self.lookup(name).is_some() {
            return Err(Error::AlreadyExists);
        }
        if FileEntry::record_len_for(0) > self.superblock.block_size as usize {
            return Err(Error::FileTooLarge);
        }
        let block_id = alloc_block(&mut self.superblock, BlockType::FileEntry)?;
        let entry = FileEntry::new(block_id, name.as_bytes())?;
        self.files.insert(block_id, entry);
        Ok(block_id)
    }

    /// Registers a record built by the caller.
    /// Its entry block and data blocks must already be allocated with the right tags.
    pub fn register_file(&mut self, entry: FileEntry) -> Result<()> {
        if self.files.contains_key(&entry.metadata_block_id)
            || self.files.values().any(|f| f.name_eq(entry.name()))
        {
            return Err(Error::AlreadyExists);
        }
        check_file_entry(&self.superblock, &entry)?;
        let mut owners = HashMap::new();
        for f in self.files.values() {
            claim_data_blocks(&mut owners, f)?;
        }
        claim_data_blocks(&mut owners, &entry)?;
        self.files.insert(entry.metadata_block_id, entry);
        Ok(())
    }

    /// Drops a file and returns its data blocks and entry block to the free pool.
    pub fn remove_file(&mut self, name: &str) -> Result<FileEntry> {
        let id = self.lookup(name).ok_or(Error::NotFound)?.metadata_block_id;
        if let Some(entry) = self.files.get(&id) {
            for &block_id in entry.block_ids.iter().chain([&id]) {
                check_freeable(&self.superblock, block_id)?;
            }
        }
        let entry = self.files.remove(&id).ok_or(Error::NotFound)?;
        for &block_id in &entry.block_ids {
            free_block(&mut self.superblock, block_id)?;
        }
        free_block(&mut self.superblock, id)?;
        Ok(entry)
    }

    pub fn lookup(&self, name: &str) -> Option<&FileEntry> {
        self.files.values().find(|f| f.name_eq_str(name))
    }

    pub fn file(&self, id: u32) -> Option<&FileEntry> {
        self.files.get(&id)
    }

    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.values()
    }

    /// Entry block id of the file that owns `block_id`, as its entry block or one of its data blocks.
    pub fn owner_of(&self, block_id: u32) -> Option<u32> {
        self.files
            .values()
            .find(|f| f.metadata_block_id == block_id || f.block_ids.contains(&block_id))
            .map(|f| f.metadata_block_id)
    }

    // File content.

    pub fn write_file(&mut self, id: u32, offset: usize, buf: &[u8]) -> Result<usize> {
        let entry = self.files.get_mut(&id).ok_or(Error::NotFound)?;
        fwrite(&*self.device, &mut self.superblock, entry, offset, buf)
    }

    pub fn read_file(&self, id: u32, offset: usize, buf: &mut [u8]) -> Result<usize> {
        let entry = self.files.get(&id).ok_or(Error::NotFound)?;
        fread(&*self.device, &self.superblock, entry, offset, buf)
    }

    pub fn truncate_file(&mut self, id: u32) -> Result<()> {
        let entry = self.files.get_mut(&id).ok_or(Error::NotFound)?;
        ftruncate(&mut self.superblock, entry)
    }

    /// Human readable summary: geometry, every block tag, then one line per file.
    pub fn dump(&self) -> String {
        let mut out = format!(
            "Dumping fat with {} blocks of size {}:\n",
            self.superblock.block_count, self.superblock.block_size
        );
        let tags: Vec<String> = self
            .superblock
            .block_map
            .iter()
            .map(|&t| u8::from(t).to_string())
            .collect();
        out.push_str(&tags.join(" "));
        out.push('\n');
        for entry in self.files.values() {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out
    }

    pub fn backing_store_id(&self) -> String {
        self.device.id()
    }

    pub fn block_size(&self) -> u32 {
        self.superblock.block_size
    }

    pub fn block_count(&self) -> u32 {
        self.superblock.block_count
    }

    pub fn block_map(&self) -> &[BlockType] {
        &self.superblock.block_map
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    pub fn device(&self) -> Arc<D> {
        Arc::clone(&self.device)
    }
}

impl FileSystem<ImageFile> {
    /// Creates (or overwrites) the image file at `path` and formats it.
    pub fn create(path: impl AsRef<Path>, block_size: u32, block_count: u32) -> Result<Self> {
        Self::format(Arc::new(ImageFile::new(path)), block_size, block_count)
    }

    /// Loads the image file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(Arc::new(ImageFile::new(path)))
    }
}
