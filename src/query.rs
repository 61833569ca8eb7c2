// CLASSIFICATION: COMMUNITY
// Filename: query.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Text surface for field diagnostics.
//!
//! Reading renders the decoded history, one line per slot:
//!
//! ```text
//! reboot stack
//! 0: normal reboot
//! 1: hard watchdog reboot, oom
//! 2: unknown
//! ```
//!
//! Writing accepts `oom` or `oops` to deliberately fault the system and
//! exercise the capture path. Those hooks only fire in builds with the
//! `fault-injection` feature.

use std::fmt::Write;

use log::{info, warn};
use thiserror::Error;

use crate::register::{DecodedHistory, Slot};
use crate::tracker::{RebootTracker, TrackerError};

/// First line of the rendered history.
pub const HISTORY_HEADER: &str = "reboot stack";
/// Only this many leading bytes of a write are inspected.
pub const COMMAND_WINDOW: usize = 8;

/// Errors returned by the [`QuerySurface`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("no reboot history available")]
    NoHistory,
    #[error("empty command")]
    EmptyCommand,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("fault-injection hooks are disabled in this build")]
    HooksDisabled,
}

/// Render one history slot as `<index>: <reason>[, oom]`.
pub fn render_slot(index: usize, slot: Slot) -> String {
    format!("{index}: {slot}")
}

/// Render the history block, header included.
pub fn render_history(history: &DecodedHistory) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{HISTORY_HEADER}");
    for (index, slot) in history.history.iter().enumerate() {
        let _ = writeln!(out, "{}", render_slot(index, *slot));
    }
    out
}

/// Render the tracker's history. Any failure reads as "no history"; the
/// cause only goes to the log.
pub fn read_history(tracker: &RebootTracker) -> Result<String, QueryError> {
    match tracker.query_history() {
        Ok(history) => Ok(render_history(&history)),
        Err(TrackerError::InvalidMagic(magic)) => {
            info!("reboot register magic {magic:#x} does not match");
            Err(QueryError::NoHistory)
        }
        Err(err) => {
            warn!("reboot history unavailable: {err}");
            Err(QueryError::NoHistory)
        }
    }
}

/// Literal test commands accepted on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestCommand {
    Oom,
    Oops,
}

impl TestCommand {
    /// Parse the first whitespace-delimited word of the first
    /// [`COMMAND_WINDOW`] bytes.
    pub fn parse(buf: &[u8]) -> Result<Self, QueryError> {
        let window = &buf[..buf.len().min(COMMAND_WINDOW)];
        let text = String::from_utf8_lossy(window);
        let word = text
            .split(|c: char| c.is_ascii_whitespace() || c == '\0')
            .find(|w| !w.is_empty())
            .ok_or(QueryError::EmptyCommand)?;
        match word {
            "oom" => Ok(Self::Oom),
            "oops" => Ok(Self::Oops),
            other => Err(QueryError::UnknownCommand(other.to_string())),
        }
    }
}

/// Deliberately faults the system on request.
pub trait FaultInjector: Send + Sync {
    fn trigger_oom(&self);
    fn trigger_oops(&self);
}

/// Panic payload marking an injected oops.
///
/// The panic hook delivers it as [`FaultEvent::Oops`](crate::FaultEvent::Oops),
/// so the `oops` artifact is written and panic capture stays armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectedOops;

/// Faults the running process for real.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostFaultInjector;

/// Allocation size used while exhausting memory.
const OOM_CHUNK: usize = 1023 * 11;

impl FaultInjector for HostFaultInjector {
    fn trigger_oom(&self) {
        warn!("fault injection: exhausting memory");
        loop {
            // Touch every page so overcommit cannot hide the allocation.
            std::mem::forget(vec![0xa5u8; OOM_CHUNK]);
        }
    }

    fn trigger_oops(&self) {
        warn!("fault injection: raising oops");
        std::panic::panic_any(InjectedOops);
    }
}

/// Read/write adapter over the tracker, modelled on a `/proc` node.
pub struct QuerySurface<'a> {
    tracker: &'a RebootTracker,
    injector: &'a dyn FaultInjector,
}

impl<'a> QuerySurface<'a> {
    pub fn new(tracker: &'a RebootTracker, injector: &'a dyn FaultInjector) -> Self {
        Self { tracker, injector }
    }

    /// Render the stored history, see [`read_history`].
    pub fn read(&self) -> Result<String, QueryError> {
        read_history(self.tracker)
    }

    /// Accept a test command; returns the number of bytes consumed.
    pub fn write(&self, buf: &[u8]) -> Result<usize, QueryError> {
        let command = TestCommand::parse(buf)?;
        self.dispatch(command)?;
        Ok(buf.len())
    }

    #[cfg(feature = "fault-injection")]
    fn dispatch(&self, command: TestCommand) -> Result<(), QueryError> {
        match command {
            TestCommand::Oom => self.injector.trigger_oom(),
            TestCommand::Oops => self.injector.trigger_oops(),
        }
        Ok(())
    }

    #[cfg(not(feature = "fault-injection"))]
    fn dispatch(&self, command: TestCommand) -> Result<(), QueryError> {
        let _ = self.injector;
        warn!("ignoring {command:?} test command: fault injection not built in");
        Err(QueryError::HooksDisabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::{ReasonCode, ReasonRegister};

    #[test]
    fn history_renders_three_slots_with_oom_suffix() {
        let reg = ReasonRegister::INITIALIZED
            .set_reason(ReasonCode::Watchdog)
            .set_oom_flag()
            .shift()
            .set_reason(ReasonCode::Reboot)
            .shift();
        assert_eq!(
            render_history(&reg.decode()),
            "reboot stack\n0: normal reboot\n1: hard watchdog reboot, oom\n2: unknown\n"
        );
    }

    #[test]
    fn commands_parse_from_leading_word() {
        assert_eq!(TestCommand::parse(b"oom\n"), Ok(TestCommand::Oom));
        assert_eq!(TestCommand::parse(b"  \toops extra"), Ok(TestCommand::Oops));
        assert_eq!(TestCommand::parse(b"   \n"), Err(QueryError::EmptyCommand));
        assert_eq!(
            TestCommand::parse(b"reboot"),
            Err(QueryError::UnknownCommand("reboot".into()))
        );
    }

    #[test]
    fn only_the_command_window_is_inspected() {
        // "oops" starts past the 8-byte window.
        assert_eq!(TestCommand::parse(b"        oops"), Err(QueryError::EmptyCommand));
        assert_eq!(
            TestCommand::parse(b"oomoomoomoom"),
            Err(QueryError::UnknownCommand("oomoomoo".into()))
        );
    }
}
