// CLASSIFICATION: COMMUNITY
// Filename: irq.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Scoped interrupt enabling around the one blocking step of a capture.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Local interrupt mask of the CPU running the fault handler.
pub trait InterruptControl: Send + Sync {
    fn enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool);
}

/// Interrupts are enabled for the guard's lifetime; the prior state is
/// restored on drop, on every exit path.
pub struct InterruptibleWindow<'a> {
    control: &'a dyn InterruptControl,
    prior: bool,
}

impl<'a> InterruptibleWindow<'a> {
    pub fn open(control: &'a dyn InterruptControl) -> Self {
        let prior = control.enabled();
        if !prior {
            control.set_enabled(true);
        }
        Self { control, prior }
    }
}

impl Drop for InterruptibleWindow<'_> {
    fn drop(&mut self) {
        if !self.prior {
            self.control.set_enabled(false);
        }
    }
}

/// Software interrupt flag for hosted builds, where the process cannot mask
/// real interrupts. Counts transitions so callers can see the window open.
#[derive(Debug)]
pub struct SoftInterrupts {
    enabled: AtomicBool,
    transitions: AtomicUsize,
}

impl Default for SoftInterrupts {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SoftInterrupts {
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            transitions: AtomicUsize::new(0),
        }
    }

    /// Number of enable/disable changes so far.
    pub fn transitions(&self) -> usize {
        self.transitions.load(Ordering::SeqCst)
    }
}

impl InterruptControl for SoftInterrupts {
    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        if self.enabled.swap(enabled, Ordering::SeqCst) != enabled {
            self.transitions.fetch_add(1, Ordering::SeqCst);
        }
    }
}
