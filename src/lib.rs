//! Minifat is a tiny block-structured virtual disk kept in a single host file.
//! For simplicity, there is one flat directory and no permissions, timestamps or journaling.
//!
//! Image layout:
//! - Block 0: block size, block count and the block-type map (one tag byte per block)
//! - File entry blocks: one file record each (name, size, data block ids)
//! - Data blocks: raw file content
//!
//! There is no on-disk index: loading scans the block map for file entry blocks
//! and rebuilds every record from them.
//!
//! Minifat's layers (from bottom to top):
//! 1. Block Device: byte access to the backing store.        | Host file, per call or per session
//! 2. Block Store: (block, offset, length) regions.          | Never crosses a block boundary
//! 3. Block Map: allocation tags for every block.            | In memory until saved
//! 4. Directory: file records and the load-time scan.        | One record per entry block
//! 5. File: content spread over a record's data blocks.      | Size and block ids in memory until saved
//! 6. FileSystem: the handle tying the layers together.      | One owner per image

mod config;
mod block_dev;
mod block_io;
mod structs;
mod block_map;
mod superblock;
mod directory;
mod file;
mod fs;
mod error;

pub use block_dev::{BlockDevice, ImageFile, SessionImageFile};
pub use block_io::{read_block_region, write_block_region};
pub use block_map::{alloc_block, check_freeable, find_empty_block, free_block};
pub use config::*;
pub use superblock::*;
pub use structs::*;
pub use directory::*;
pub use fs::*;
pub use error::FsError as Error;
pub use error::Result;
