// CLASSIFICATION: COMMUNITY
// Filename: guard.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Admission control for fault captures.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::FaultEvent;

/// Why a fault delivery was not captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    /// Another panic is already being handled; `depth` counts this one.
    NestedPanic { depth: u32 },
    /// An OOM sequence owns the storage.
    Ooming,
    /// An orderly reboot owns the storage.
    Rebooting,
}

/// Capture state as seen by the next fault delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Nothing in flight and nothing suppressing the next panic.
    Idle,
    /// A capture holds the buffer.
    Capturing,
    /// The next panic would return without touching buffer or artifact.
    Suppressed(Suppression),
}

/// Re-entrancy counter plus the sticky OOM/reboot flags.
///
/// Lives as long as the process; there is no reset, since the next event
/// after a panic or reboot is power-on.
#[derive(Debug, Default)]
pub struct CaptureGuard {
    panicking: AtomicU32,
    ooming: AtomicBool,
    rebooting: AtomicBool,
}

impl CaptureGuard {
    pub const fn new() -> Self {
        Self {
            panicking: AtomicU32::new(0),
            ooming: AtomicBool::new(false),
            rebooting: AtomicBool::new(false),
        }
    }

    pub fn mark_ooming(&self) {
        self.ooming.store(true, Ordering::SeqCst);
    }

    pub fn mark_rebooting(&self) {
        self.rebooting.store(true, Ordering::SeqCst);
    }

    pub fn is_ooming(&self) -> bool {
        self.ooming.load(Ordering::SeqCst)
    }

    pub fn is_rebooting(&self) -> bool {
        self.rebooting.load(Ordering::SeqCst)
    }

    /// Number of panic deliveries seen so far.
    pub fn panic_depth(&self) -> u32 {
        self.panicking.load(Ordering::SeqCst)
    }

    /// Decide whether `event` may capture; `Some` names why it may not.
    ///
    /// A panic bumps the counter before anything else is checked, so a
    /// nested panic always observes the outer one. Only panics are counted
    /// or gated.
    pub fn admit(&self, event: FaultEvent) -> Option<Suppression> {
        if event != FaultEvent::Panic {
            return None;
        }
        let depth = self.panicking.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        if depth > 1 {
            Some(Suppression::NestedPanic { depth })
        } else if self.is_ooming() {
            Some(Suppression::Ooming)
        } else if self.is_rebooting() {
            Some(Suppression::Rebooting)
        } else {
            None
        }
    }

    /// State a panic arriving now would run into, without counting it.
    pub fn state(&self) -> CaptureState {
        let depth = self.panic_depth();
        if depth > 0 {
            CaptureState::Suppressed(Suppression::NestedPanic { depth: depth + 1 })
        } else if self.is_ooming() {
            CaptureState::Suppressed(Suppression::Ooming)
        } else if self.is_rebooting() {
            CaptureState::Suppressed(Suppression::Rebooting)
        } else {
            CaptureState::Idle
        }
    }
}
