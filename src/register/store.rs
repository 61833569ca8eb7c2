// CLASSIFICATION: COMMUNITY
// Filename: store.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Byte-addressed non-volatile register banks (CMOS and friends).

#[cfg(unix)]
use std::fs::{File, OpenOptions};
#[cfg(unix)]
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use spin::Mutex;
use thiserror::Error;

/// Size of the emulated CMOS bank exposed by [`MemoryStore`].
pub const CMOS_BANK_SIZE: usize = 128;

/// Errors reported by a [`RegisterStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("register read failed at offset {offset:#04x} ({len} bytes)")]
    Read { offset: u8, len: usize },
    #[error("register write failed at offset {offset:#04x} ({len} bytes)")]
    Write { offset: u8, len: usize },
    #[error("short register read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },
    #[error("short register write: expected {expected} bytes, wrote {actual}")]
    ShortWrite { expected: usize, actual: usize },
    #[error("register i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw access to the persistent register bank.
///
/// Implementations may fail at any time; a failed call must leave the bank
/// unchanged from the caller's point of view.
pub trait RegisterStore: Send + Sync {
    /// Fill `buf` from `offset`, returning the number of bytes read.
    fn read(&self, offset: u8, buf: &mut [u8]) -> Result<usize, StoreError>;

    /// Write `bytes` at `offset`, returning the number of bytes written.
    fn write(&self, offset: u8, bytes: &[u8]) -> Result<usize, StoreError>;
}

impl<T: RegisterStore + ?Sized> RegisterStore for Arc<T> {
    fn read(&self, offset: u8, buf: &mut [u8]) -> Result<usize, StoreError> {
        (**self).read(offset, buf)
    }

    fn write(&self, offset: u8, bytes: &[u8]) -> Result<usize, StoreError> {
        (**self).write(offset, bytes)
    }
}

impl<T: RegisterStore + ?Sized> RegisterStore for Box<T> {
    fn read(&self, offset: u8, buf: &mut [u8]) -> Result<usize, StoreError> {
        (**self).read(offset, buf)
    }

    fn write(&self, offset: u8, bytes: &[u8]) -> Result<usize, StoreError> {
        (**self).write(offset, bytes)
    }
}

/// In-memory CMOS bank with switchable failure injection.
///
/// Used on hosts without a real register device and throughout the tests.
pub struct MemoryStore {
    bank: Mutex<[u8; CMOS_BANK_SIZE]>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a zeroed bank, as found on a factory-fresh board.
    pub const fn new() -> Self {
        Self {
            bank: Mutex::new([0; CMOS_BANK_SIZE]),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Create a bank with `bytes` preloaded at `offset`.
    pub fn with_bytes(offset: u8, bytes: &[u8]) -> Self {
        let store = Self::new();
        {
            let mut bank = store.bank.lock();
            let start = (offset as usize).min(CMOS_BANK_SIZE);
            let end = (start + bytes.len()).min(CMOS_BANK_SIZE);
            bank[start..end].copy_from_slice(&bytes[..end - start]);
        }
        store
    }

    /// Make every subsequent read fail until cleared.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail until cleared.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of `len` bytes at `offset`, bypassing failure injection.
    pub fn peek(&self, offset: u8, len: usize) -> Vec<u8> {
        let bank = self.bank.lock();
        let start = (offset as usize).min(CMOS_BANK_SIZE);
        let end = (start + len).min(CMOS_BANK_SIZE);
        bank[start..end].to_vec()
    }

    fn range(offset: u8, len: usize) -> Option<core::ops::Range<usize>> {
        let start = offset as usize;
        let end = start.checked_add(len)?;
        (end <= CMOS_BANK_SIZE).then_some(start..end)
    }
}

impl RegisterStore for MemoryStore {
    fn read(&self, offset: u8, buf: &mut [u8]) -> Result<usize, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Read { offset, len: buf.len() });
        }
        let range = Self::range(offset, buf.len()).ok_or(StoreError::Read {
            offset,
            len: buf.len(),
        })?;
        buf.copy_from_slice(&self.bank.lock()[range]);
        Ok(buf.len())
    }

    fn write(&self, offset: u8, bytes: &[u8]) -> Result<usize, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write { offset, len: bytes.len() });
        }
        let range = Self::range(offset, bytes.len()).ok_or(StoreError::Write {
            offset,
            len: bytes.len(),
        })?;
        self.bank.lock()[range].copy_from_slice(bytes);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(bytes.len())
    }
}

/// Register bank backed by a device node such as `/dev/nvram`.
///
/// Offsets are applied as file positions; the kernel driver maps them onto
/// the CMOS index/data ports.
#[cfg(unix)]
pub struct NvramStore {
    file: File,
}

#[cfg(unix)]
impl NvramStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }
}

#[cfg(unix)]
impl RegisterStore for NvramStore {
    fn read(&self, offset: u8, buf: &mut [u8]) -> Result<usize, StoreError> {
        use std::os::unix::fs::FileExt;
        Ok(self.file.read_at(buf, u64::from(offset))?)
    }

    fn write(&self, offset: u8, bytes: &[u8]) -> Result<usize, StoreError> {
        use std::os::unix::fs::FileExt;
        Ok(self.file.write_at(bytes, u64::from(offset))?)
    }
}
