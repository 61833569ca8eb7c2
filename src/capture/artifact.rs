// CLASSIFICATION: COMMUNITY
// Filename: artifact.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Persisting captured log text to named files.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Destination for captured bytes.
pub trait ArtifactSink: Send + Sync {
    /// Replace the contents of `path` with `bytes`, returning the bytes written.
    fn create_or_truncate_and_write(&self, path: &Path, bytes: &[u8]) -> io::Result<usize>;
}

/// Writes artifacts straight to the filesystem and syncs them before
/// returning, since the machine is usually about to go down.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsArtifactSink;

impl ArtifactSink for FsArtifactSink {
    fn create_or_truncate_and_write(&self, path: &Path, bytes: &[u8]) -> io::Result<usize> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(bytes.len())
    }
}
