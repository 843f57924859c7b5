pub const DEFAULT_BLOCK_SIZE: u32 = 512;
pub const DEFAULT_BLOCK_COUNT: u32 = 100;
pub const SUPERBLOCK_ID: u32 = 0; // Block ID holding the header and block map

pub const HEADER_FIXED_LEN: usize = 8; // block_size (4 bytes) + block_count (4 bytes)

pub const MAX_FILE_NAME_LEN: usize = 64; // Fixed width of the on-disk name field
pub const FILE_SIZE_LEN: usize = 4; // Width of the on-disk size field
pub const BLOCK_ID_LEN: usize = 4; // Width of each on-disk block id entry
pub const FILE_ENTRY_FIXED_LEN: usize = MAX_FILE_NAME_LEN + FILE_SIZE_LEN; // Record length with no block ids
