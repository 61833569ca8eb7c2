// CLASSIFICATION: COMMUNITY
// Filename: logging.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Logger setup: `env_logger` for the console, teed into the kernel message
//! ring so fault captures contain the recent log.

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::capture::kmsg::KmsgRing;

/// Records at or above this level always reach the ring.
pub const RING_LEVEL: LevelFilter = LevelFilter::Info;

struct TeeLogger<const N: usize> {
    console: env_logger::Logger,
    ring: &'static KmsgRing<N>,
}

impl<const N: usize> Log for TeeLogger<N> {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= RING_LEVEL || self.console.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if self.console.matches(record) {
            self.console.log(record);
        }
        if record.level() <= RING_LEVEL {
            self.ring.log(record);
        }
    }

    fn flush(&self) {
        self.console.flush();
    }
}

/// Install the global logger. `RUST_LOG` filters the console as usual.
pub fn init<const N: usize>(ring: &'static KmsgRing<N>) -> Result<(), SetLoggerError> {
    let console = env_logger::Builder::from_default_env().build();
    let max = console.filter().max(RING_LEVEL);
    log::set_boxed_logger(Box::new(TeeLogger { console, ring }))?;
    log::set_max_level(max);
    Ok(())
}
