// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Crash capture coordinator.
//!
//! Fault deliveries (oops, panic, emergency restart) and lifecycle
//! notifications (OOM, orderly reboot) land here. Fatal faults snapshot the
//! kernel message ring into a preallocated buffer and persist it under the
//! artifact directory as `oops` or `panic`. Nothing on these paths waits for
//! a lock: a busy buffer means the capture is skipped.

pub mod artifact;
pub mod guard;
pub mod irq;
pub mod kmsg;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};
use spin::Mutex;
use thiserror::Error;

use crate::config::DumperConfig;
use crate::register::ReasonCode;
use crate::tracker::{RebootTracker, TrackerError};

use artifact::ArtifactSink;
use guard::{CaptureGuard, CaptureState, Suppression};
use irq::{InterruptControl, InterruptibleWindow};
use kmsg::LogSource;

/// Fault-class event delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultEvent {
    /// Non-fatal kernel fault; the system keeps running.
    Oops,
    /// Fatal fault.
    Panic,
    /// The reset line is about to be pulled.
    EmergencyImminent,
}

impl FaultEvent {
    /// File name of the artifact this event produces, if any.
    pub const fn artifact_name(self) -> Option<&'static str> {
        match self {
            Self::Oops => Some("oops"),
            Self::Panic => Some("panic"),
            Self::EmergencyImminent => None,
        }
    }
}

/// What a delivery ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Emergency restart recorded in the register; no capture.
    ReasonRecorded,
    /// Log persisted to `artifact`.
    Captured { artifact: PathBuf, len: usize },
    /// Capture deliberately not attempted.
    Suppressed(Suppression),
}

/// Errors returned by [`CaptureCoordinator`] operations.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture buffer busy; capture skipped")]
    CaptureBufferBusy,
    #[error("failed to write artifact {}: {source}", path.display())]
    ArtifactWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// Host-provided pieces the coordinator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub log: Arc<dyn LogSource>,
    pub sink: Arc<dyn ArtifactSink>,
    pub irq: Arc<dyn InterruptControl>,
}

/// Serialises fault captures and feeds lifecycle events to the tracker.
pub struct CaptureCoordinator {
    tracker: Arc<RebootTracker>,
    guard: CaptureGuard,
    buffer: Mutex<Box<[u8]>>,
    capturing: AtomicBool,
    artifact_dir: PathBuf,
    panic_on_oom: bool,
    collaborators: Collaborators,
}

impl CaptureCoordinator {
    /// Preallocate the capture buffer; nothing is allocated per fault.
    pub fn new(tracker: Arc<RebootTracker>, collaborators: Collaborators, config: &DumperConfig) -> Self {
        Self {
            tracker,
            guard: CaptureGuard::new(),
            buffer: Mutex::new(vec![0u8; config.capture_capacity].into_boxed_slice()),
            capturing: AtomicBool::new(false),
            artifact_dir: config.artifact_dir.clone(),
            panic_on_oom: config.panic_on_oom,
            collaborators,
        }
    }

    pub fn guard(&self) -> &CaptureGuard {
        &self.guard
    }

    /// True while a capture holds the buffer.
    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    /// State the next fault delivery would run into.
    pub fn state(&self) -> CaptureState {
        if self.is_capturing() {
            CaptureState::Capturing
        } else {
            self.guard.state()
        }
    }

    /// Handle one fault delivery.
    pub fn on_fault(&self, event: FaultEvent) -> CaptureResult<CaptureOutcome> {
        let Some(name) = event.artifact_name() else {
            // May run with interrupts off: record and leave, never spin.
            if let Err(err) = self.tracker.try_record_reason(ReasonCode::Emergency) {
                warn!("emergency restart reason not recorded: {err}");
                return Err(err.into());
            }
            return Ok(CaptureOutcome::ReasonRecorded);
        };
        if let Some(why) = self.guard.admit(event) {
            debug!("{event:?} capture suppressed: {why:?}");
            return Ok(CaptureOutcome::Suppressed(why));
        }
        self.capture(name)
    }

    /// OOM notification. Only meaningful when OOM panics the system.
    pub fn on_oom(&self) -> CaptureResult<()> {
        if !self.panic_on_oom {
            debug!("oom notification ignored; panic_on_oom disabled");
            return Ok(());
        }
        self.guard.mark_ooming();
        self.tracker.flag_oom().map_err(|err| {
            warn!("failed to flag oom in reboot register: {err}");
            CaptureError::from(err)
        })
    }

    /// Orderly reboot notification.
    pub fn on_reboot(&self) -> CaptureResult<()> {
        self.guard.mark_rebooting();
        self.tracker.record_reason(ReasonCode::Reboot).map_err(|err| {
            warn!("failed to record reboot reason: {err}");
            CaptureError::from(err)
        })
    }

    fn capture(&self, name: &'static str) -> CaptureResult<CaptureOutcome> {
        let Some(mut buffer) = self.buffer.try_lock() else {
            return Err(CaptureError::CaptureBufferBusy);
        };
        self.capturing.store(true, Ordering::SeqCst);
        let len = self.collaborators.log.snapshot(&mut buffer);
        let path = self.artifact_dir.join(name);
        info!(
            "dumping kernel {name} message to file: {}, text_len = {len}",
            path.display()
        );

        let written = {
            let _window = InterruptibleWindow::open(self.collaborators.irq.as_ref());
            self.collaborators
                .sink
                .create_or_truncate_and_write(&path, &buffer[..len])
        };
        self.capturing.store(false, Ordering::SeqCst);

        match written {
            Ok(len) => Ok(CaptureOutcome::Captured { artifact: path, len }),
            Err(source) => {
                error!("{name} capture to {} failed: {source}", path.display());
                Err(CaptureError::ArtifactWriteFailed { path, source })
            }
        }
    }
}
