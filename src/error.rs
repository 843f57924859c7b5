use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("backing store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("filesystem is full")]
    OutOfSpace,
    #[error("region out of bounds: block {block_id}, offset {offset}, length {len}")]
    OutOfBounds {
        block_id: u32,
        offset: usize,
        len: usize,
    },
    #[error("invalid block id {0}")]
    InvalidBlockId(u32),
    #[error("invalid block type tag {0:#04x}")]
    InvalidBlockType(u8),
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("invalid geometry: block size {block_size}, block count {block_count}")]
    InvalidGeometry { block_size: u32, block_count: u32 },
    #[error("invalid superblock: {0}")]
    InvalidSuperBlock(String),
    #[error("corrupted file entry in block {block_id}: {detail}")]
    CorruptedEntry { block_id: u32, detail: String },
    #[error("file record no longer fits in its entry block")]
    FileTooLarge,
    #[error("invalid file name")]
    InvalidFileName,
    #[error("file not found")]
    NotFound,
    #[error("file already exists")]
    AlreadyExists,
}

impl FsError {
    /// Whether the session can continue after this error.
    /// I/O failures and on-disk corruption leave nothing sensible to continue with.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FsError::OutOfSpace
                | FsError::OutOfBounds { .. }
                | FsError::InvalidBlockId(_)
                | FsError::InvalidArgument(_)
                | FsError::InvalidGeometry { .. }
                | FsError::FileTooLarge
                | FsError::InvalidFileName
                | FsError::NotFound
                | FsError::AlreadyExists
        )
    }
}

pub type Result<T> = core::result::Result<T, FsError>;
