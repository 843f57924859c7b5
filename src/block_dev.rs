//! Backing stores for an image.
//! A block device only knows about bytes; block geometry is applied by the block store on top of it.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::warn;

use crate::error::Result;

pub trait BlockDevice: Send + Sync {
    /// Identifier of the backing store, e.g. the host path of an image file.
    fn id(&self) -> String;

    /// Current length of the backing store in bytes.
    fn size(&self) -> Result<u64>;

    /// Creates the backing store if needed and resizes it to exactly `len` zero bytes.
    /// Previous content is discarded.
    fn reset(&self, len: u64) -> Result<()>;

    /// Reads up to `buf.len()` bytes starting at `offset`.
    /// A short count means the end of the store was reached.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Writes `buf` starting at `offset` and returns the number of bytes written.
    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize>;

    /// Makes previous writes durable.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Reads until `buf` is full or the file ends.
fn read_full(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match file.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

fn reset_file(path: &Path, len: u64) -> io::Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.set_len(len)?;
    Ok(file)
}

/// Image file that is opened and closed again on every access.
/// Nothing stays open between calls, so dropping it needs no cleanup.
#[derive(Debug, Clone)]
pub struct ImageFile {
    path: PathBuf,
}

impl ImageFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockDevice for ImageFile {
    fn id(&self) -> String {
        self.path.display().to_string()
    }

    fn size(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    fn reset(&self, len: u64) -> Result<()> {
        reset_file(&self.path, len)?;
        Ok(())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(read_full(&mut file, buf)?)
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize> {
        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        Ok(buf.len())
    }
}

/// Image file kept open for the whole session.
/// Pending writes are synced by `flush` and again when the device is dropped.
#[derive(Debug)]
pub struct SessionImageFile {
    path: PathBuf,
    inner: Mutex<File>,
}

impl SessionImageFile {
    /// Opens an existing image for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(Self {
            path,
            inner: Mutex::new(file),
        })
    }

    /// Opens the image, creating an empty file if it does not exist yet.
    /// Use this before formatting.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self {
            path,
            inner: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, File>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("image file lock poisoned"))
    }
}

impl BlockDevice for SessionImageFile {
    fn id(&self) -> String {
        self.path.display().to_string()
    }

    fn size(&self) -> Result<u64> {
        Ok(self.lock()?.metadata()?.len())
    }

    fn reset(&self, len: u64) -> Result<()> {
        let file = self.lock()?;
        file.set_len(0)?;
        file.set_len(len)?;
        Ok(())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(read_full(&mut file, buf)?)
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize> {
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&self) -> Result<()> {
        let mut file = self.lock()?;
        file.flush()?;
        file.sync_data()?;
        Ok(())
    }
}

impl Drop for SessionImageFile {
    fn drop(&mut self) {
        if let Ok(file) = self.inner.get_mut() {
            if let Err(e) = file.sync_data() {
                warn!("failed to sync {} on close: {}", self.path.display(), e);
            }
        }
    }
}
