//! Common utilities for tests

#![allow(unused)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use minifat::{BlockDevice, Error, Result};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// Backing store held in memory. Grows on writes past the end, like a host file.
#[derive(Debug)]
pub struct RamDisk {
    inner: Mutex<Vec<u8>>,
    fail_writes: AtomicBool,
}

impl RamDisk {
    pub fn new() -> Self {
        RamDisk {
            inner: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Copy of the raw image bytes.
    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().unwrap().clone()
    }

    /// Overwrites raw bytes, bypassing the file system.
    pub fn poke(&self, offset: usize, bytes: &[u8]) {
        let mut data = self.inner.lock().unwrap();
        data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// While set, every write fails with an I/O error and leaves the bytes alone.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn truncate(&self, len: usize) {
        self.inner.lock().unwrap().truncate(len);
    }
}

impl BlockDevice for RamDisk {
    fn id(&self) -> String {
        "ramdisk".to_string()
    }

    fn size(&self) -> Result<u64> {
        Ok(self.inner.lock().unwrap().len() as u64)
    }

    fn reset(&self, len: u64) -> Result<()> {
        *self.inner.lock().unwrap() = vec![0u8; len as usize];
        Ok(())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let data = self.inner.lock().unwrap();
        let start = (offset as usize).min(data.len());
        let end = (start + buf.len()).min(data.len());
        buf[..end - start].copy_from_slice(&data[start..end]);
        Ok(end - start)
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("write failed")));
        }
        let mut data = self.inner.lock().unwrap();
        let start = offset as usize;
        let end = start + buf.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok(buf.len())
    }
}
