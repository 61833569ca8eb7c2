// CLASSIFICATION: COMMUNITY
// Filename: tracker.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Owner of the persistent reboot-reason register.
//!
//! Every mutation is a read-modify-write against the store, serialised by a
//! single lock so concurrent `record_reason` / `flag_oom` calls never compute
//! from a stale read. Nothing is cached: each call goes back to the device.

use log::{debug, error, info};
use spin::Mutex;
use thiserror::Error;

use crate::register::store::{RegisterStore, StoreError};
use crate::register::{DecodedHistory, ReasonCode, ReasonRegister, REGISTER_WIDTH};

/// Errors returned by [`RebootTracker`] operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("register read failed: {0}")]
    StoreReadFailed(#[source] StoreError),
    #[error("register write failed: {0}")]
    StoreWriteFailed(#[source] StoreError),
    #[error("register magic {0:#x} does not match; no history recorded")]
    InvalidMagic(u8),
    #[error("register update already in progress")]
    RegisterBusy,
}

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Reboot-reason register bound to its store.
pub struct RebootTracker {
    store: Box<dyn RegisterStore>,
    offset: u8,
    lock: Mutex<()>,
}

impl RebootTracker {
    /// Bind to the register at `offset` without touching it.
    pub fn new(store: Box<dyn RegisterStore>, offset: u8) -> Self {
        Self {
            store,
            offset,
            lock: Mutex::new(()),
        }
    }

    /// Bind to the register and run the boot-time shift.
    ///
    /// A failed shift is logged and the tracker is returned anyway; later
    /// calls keep retrying the device.
    pub fn init(store: Box<dyn RegisterStore>, offset: u8) -> Self {
        let tracker = Self::new(store, offset);
        match tracker.shift() {
            Ok(reg) => info!("reboot register at {offset:#04x} shifted to {reg}"),
            Err(err) => error!("boot-time register shift failed: {err}; continuing best-effort"),
        }
        tracker
    }

    /// Demote `current` into history. Runs once per boot.
    pub fn shift(&self) -> TrackerResult<ReasonRegister> {
        let _guard = self.lock.lock();
        let old = self.load()?;
        if !old.is_valid() {
            info!("reboot register magic {:#x} invalid; reinitialising", old.magic());
        }
        let new = old.shift();
        self.store(new)?;
        Ok(new)
    }

    /// Record why the running boot is about to end.
    pub fn record_reason(&self, code: ReasonCode) -> TrackerResult<()> {
        let _guard = self.lock.lock();
        self.modify(|reg| reg.set_reason(code))
    }

    /// Like [`Self::record_reason`], but gives up instead of spinning when
    /// another update holds the register. Safe to call from fault context.
    pub fn try_record_reason(&self, code: ReasonCode) -> TrackerResult<()> {
        let _guard = self.lock.try_lock().ok_or(TrackerError::RegisterBusy)?;
        self.modify(|reg| reg.set_reason(code))
    }

    /// Mark the running boot as having hit an out-of-memory condition.
    pub fn flag_oom(&self) -> TrackerResult<()> {
        let _guard = self.lock.lock();
        self.modify(ReasonRegister::set_oom_flag)
    }

    /// Decode the stored history. Fails with `InvalidMagic` before the first shift.
    pub fn query_history(&self) -> TrackerResult<DecodedHistory> {
        let reg = self.read_raw()?;
        if !reg.is_valid() {
            return Err(TrackerError::InvalidMagic(reg.magic()));
        }
        Ok(reg.decode())
    }

    /// Current register value, valid or not.
    pub fn read_raw(&self) -> TrackerResult<ReasonRegister> {
        let _guard = self.lock.lock();
        self.load()
    }

    fn modify(&self, update: impl FnOnce(ReasonRegister) -> ReasonRegister) -> TrackerResult<()> {
        let old = self.load()?;
        let new = update(old);
        if new == old {
            debug!("reboot register already {old}; skipping write");
            return Ok(());
        }
        self.store(new)
    }

    fn load(&self) -> TrackerResult<ReasonRegister> {
        let mut bytes = [0u8; REGISTER_WIDTH as usize];
        let read = self
            .store
            .read(self.offset, &mut bytes)
            .map_err(TrackerError::StoreReadFailed)?;
        if read != bytes.len() {
            return Err(TrackerError::StoreReadFailed(StoreError::ShortRead {
                expected: bytes.len(),
                actual: read,
            }));
        }
        Ok(ReasonRegister::from_le_bytes(bytes))
    }

    fn store(&self, reg: ReasonRegister) -> TrackerResult<()> {
        let bytes = reg.to_le_bytes();
        let written = self
            .store
            .write(self.offset, &bytes)
            .map_err(TrackerError::StoreWriteFailed)?;
        if written != bytes.len() {
            return Err(TrackerError::StoreWriteFailed(StoreError::ShortWrite {
                expected: bytes.len(),
                actual: written,
            }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::store::MemoryStore;

    /// Writes one byte fewer than asked; reads too when `short_reads` is set.
    struct TruncatingStore {
        short_reads: bool,
    }

    impl RegisterStore for TruncatingStore {
        fn read(&self, _offset: u8, buf: &mut [u8]) -> Result<usize, StoreError> {
            buf.fill(0);
            Ok(buf.len() - usize::from(self.short_reads))
        }

        fn write(&self, _offset: u8, bytes: &[u8]) -> Result<usize, StoreError> {
            Ok(bytes.len() - 1)
        }
    }

    #[test]
    fn held_lock_makes_emergency_record_give_up() {
        let tracker = RebootTracker::new(Box::new(MemoryStore::new()), 0x70);
        tracker.shift().unwrap();
        let held = tracker.lock.lock();
        assert!(matches!(
            tracker.try_record_reason(ReasonCode::Emergency),
            Err(TrackerError::RegisterBusy)
        ));
        drop(held);
        tracker.try_record_reason(ReasonCode::Emergency).unwrap();
        assert_eq!(tracker.read_raw().unwrap().current().code, ReasonCode::Emergency);
    }

    #[test]
    fn short_transfers_are_reported() {
        let tracker = RebootTracker::new(Box::new(TruncatingStore { short_reads: true }), 0x70);
        assert!(matches!(
            tracker.read_raw(),
            Err(TrackerError::StoreReadFailed(StoreError::ShortRead { expected: 2, actual: 1 }))
        ));

        let tracker = RebootTracker::new(Box::new(TruncatingStore { short_reads: false }), 0x70);
        assert!(matches!(
            tracker.shift(),
            Err(TrackerError::StoreWriteFailed(StoreError::ShortWrite { expected: 2, actual: 1 }))
        ));
    }
}
