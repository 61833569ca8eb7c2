// CLASSIFICATION: COMMUNITY
// Filename: collect.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Userspace snapshot of system and per-process diagnostics.
//!
//! Copies the persisted kernel messages, `/proc/meminfo` and, per pid, the
//! memory maps and open file descriptors into a target directory. Each copy
//! is best-effort: a missing process or unreadable file is logged and
//! skipped.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use bitflags::bitflags;
use log::{debug, warn};
use thiserror::Error;

/// Upper bound on pids accepted per run.
pub const MAX_PIDS: usize = 32;

bitflags! {
    /// Which artifacts to collect.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CollectFlags: u32 {
        const KMSG = 1;
        const MEMINFO = 2;
        const MAPS = 4;
        const FD = 8;
    }
}

impl Default for CollectFlags {
    fn default() -> Self {
        Self::all()
    }
}

/// Errors that abort a collection run.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("cannot prepare {}: {source}", path.display())]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where collected artifacts are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectSources {
    pub proc_root: PathBuf,
    pub messages: PathBuf,
}

impl Default for CollectSources {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            messages: PathBuf::from("/mnt/sys_log/messages"),
        }
    }
}

/// Files produced and skipped by one run.
#[derive(Debug, Default)]
pub struct CollectReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

impl CollectReport {
    fn record(&mut self, to: PathBuf, result: io::Result<()>) {
        match result {
            Ok(()) => {
                debug!("collected {}", to.display());
                self.written.push(to);
            }
            Err(err) => {
                warn!("skipping {}: {err}", to.display());
                self.skipped.push(to);
            }
        }
    }
}

/// Parse a comma-separated pid list, keeping at most [`MAX_PIDS`] entries.
pub fn parse_pids(list: &str) -> Vec<u32> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(pid) => Some(pid),
            Err(_) => {
                warn!("ignoring invalid pid {s:?}");
                None
            }
        })
        .take(MAX_PIDS)
        .collect()
}

/// Collect everything selected by `flags` into `dir`.
pub fn collect(
    dir: &Path,
    pids: &[u32],
    flags: CollectFlags,
    sources: &CollectSources,
) -> Result<CollectReport, CollectError> {
    fs::create_dir_all(dir).map_err(|source| CollectError::Prepare {
        path: dir.to_path_buf(),
        source,
    })?;
    if !dir.is_dir() {
        return Err(CollectError::NotADirectory(dir.to_path_buf()));
    }

    let mut report = CollectReport::default();
    if flags.contains(CollectFlags::KMSG) {
        let to = dir.join("kmsg");
        report.record(to.clone(), copy_file(&sources.messages, &to));
    }
    if flags.contains(CollectFlags::MEMINFO) {
        let to = dir.join("meminfo");
        report.record(to.clone(), copy_file(&sources.proc_root.join("meminfo"), &to));
    }
    for pid in pids.iter().take(MAX_PIDS) {
        let proc_dir = sources.proc_root.join(pid.to_string());
        if flags.contains(CollectFlags::MAPS) {
            let to = dir.join(format!("{pid}_maps"));
            report.record(to.clone(), copy_file(&proc_dir.join("maps"), &to));
        }
        if flags.contains(CollectFlags::FD) {
            let to = dir.join(format!("{pid}_fd"));
            report.record(to.clone(), dump_links(&proc_dir.join("fd"), &to));
        }
    }
    Ok(report)
}

fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    let mut input = File::open(from)?;
    let mut output = File::create(to)?;
    io::copy(&mut input, &mut output)?;
    Ok(())
}

/// Write `<name> <target>` for each symlink under `from`, or
/// `<from> <target>` when `from` is itself a link.
fn dump_links(from: &Path, to: &Path) -> io::Result<()> {
    let meta = fs::metadata(from)?;
    let mut out = String::new();
    if meta.is_dir() {
        let mut entries: Vec<_> = fs::read_dir(from)?.filter_map(Result::ok).collect();
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                continue;
            }
            if let Ok(target) = fs::read_link(entry.path()) {
                let _ = writeln!(out, "{name} {}", target.display());
            }
        }
    } else if let Ok(target) = fs::read_link(from) {
        let _ = writeln!(out, "{} {}", from.display(), target.display());
    }
    fs::write(to, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_list_is_trimmed_and_capped() {
        assert_eq!(parse_pids("1, 22,,abc,333"), vec![1, 22, 333]);
        let long: Vec<String> = (1..=40).map(|n| n.to_string()).collect();
        assert_eq!(parse_pids(&long.join(",")).len(), MAX_PIDS);
    }

    #[test]
    fn default_flags_select_everything() {
        assert_eq!(CollectFlags::default().bits(), 15);
        assert_eq!(
            CollectFlags::from_bits_truncate(3),
            CollectFlags::KMSG | CollectFlags::MEMINFO
        );
    }
}
