// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v1.1
// Date Modified: 2026-10-18
// Author: Lukas Bower

//! Reboot-reason tracking and crash capture for Cohesix nodes.
//!
//! A 16-bit CMOS register remembers why each of the last three boots ended;
//! the capture coordinator writes the recent kernel log to disk when a fault
//! lands.

/// Register bit layout and persistent stores
pub mod register;

/// Read-modify-write owner of the register
pub mod tracker;

/// Fault capture: guard, message ring, artifact sink, interrupt window
pub mod capture;

/// History rendering and test-command surface
pub mod query;

/// Dumper configuration
pub mod config;

/// Context object wiring tracker and coordinator together
pub mod dumper;

/// Console + ring logger
pub mod logging;

/// Userspace diagnostics collector
pub mod collect;

pub use capture::{CaptureCoordinator, CaptureError, CaptureOutcome, Collaborators, FaultEvent};
pub use config::{ConfigError, DumperConfig};
pub use dumper::{install_panic_hook, RebootDumper};
pub use register::{DecodedHistory, ReasonCode, ReasonRegister, Slot};
pub use tracker::{RebootTracker, TrackerError};
