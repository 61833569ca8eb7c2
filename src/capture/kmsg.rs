// CLASSIFICATION: COMMUNITY
// Filename: kmsg.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Kernel message ring: the diagnostic log that fault captures snapshot.

use core::fmt::{self, Write};

use heapless::{Deque, String as HeaplessString};
use log::{Log, Metadata, Record};
use spin::Mutex;

/// Default ring capacity, matching the capture buffer.
pub const KMSG_CAPACITY: usize = 64 * 1024;
/// Longest single formatted line; longer records are truncated.
pub const LINE_CAPACITY: usize = 256;

/// Source of the bytes persisted on a fault.
pub trait LogSource: Send + Sync {
    /// Copy the newest bytes of the log into `into`, returning how many were
    /// copied. Must not allocate or block.
    fn snapshot(&self, into: &mut [u8]) -> usize;
}

impl<T: LogSource + ?Sized> LogSource for &T {
    fn snapshot(&self, into: &mut [u8]) -> usize {
        (**self).snapshot(into)
    }
}

/// Fixed-capacity byte ring that drops its oldest bytes when full.
pub struct KmsgRing<const N: usize> {
    bytes: Mutex<Deque<u8, N>>,
}

impl<const N: usize> Default for KmsgRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> KmsgRing<N> {
    pub const fn new() -> Self {
        Self {
            bytes: Mutex::new(Deque::new()),
        }
    }

    /// Append raw bytes. Returns `false` without waiting if the ring is busy.
    pub fn append(&self, bytes: &[u8]) -> bool {
        let Some(mut ring) = self.bytes.try_lock() else {
            return false;
        };
        for &byte in bytes {
            if ring.is_full() {
                let _ = ring.pop_front();
            }
            let _ = ring.push_back(byte);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.bytes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Line buffer that keeps whatever prefix fits and drops the rest.
struct LineBuf(HeaplessString<LINE_CAPACITY>);

impl Write for LineBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = LINE_CAPACITY - self.0.len();
        let mut end = s.len().min(room);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        let _ = self.0.push_str(&s[..end]);
        if end < s.len() {
            return Err(fmt::Error);
        }
        Ok(())
    }
}

impl<const N: usize> LogSource for KmsgRing<N> {
    fn snapshot(&self, into: &mut [u8]) -> usize {
        let Some(ring) = self.bytes.try_lock() else {
            return 0;
        };
        let copied = ring.len().min(into.len());
        let skip = ring.len() - copied;
        for (dst, src) in into.iter_mut().zip(ring.iter().skip(skip)) {
            *dst = *src;
        }
        copied
    }
}

impl<const N: usize> Log for KmsgRing<N> {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let mut line = LineBuf(HeaplessString::new());
        let _ = write!(line, "<{}>{}: {}", record.level(), record.target(), record.args());
        let _ = self.append(line.0.as_bytes()) && self.append(b"\n");
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_drops_oldest_bytes_when_full() {
        let ring: KmsgRing<8> = KmsgRing::new();
        ring.append(b"abcdef");
        ring.append(b"ghij");
        assert_eq!(ring.len(), 8);
        let mut out = [0u8; 16];
        let n = ring.snapshot(&mut out);
        assert_eq!(&out[..n], b"cdefghij");
    }

    #[test]
    fn snapshot_keeps_newest_bytes_when_buffer_is_small() {
        let ring: KmsgRing<32> = KmsgRing::new();
        ring.append(b"first line\nsecond line\n");
        let mut out = [0u8; 12];
        let n = ring.snapshot(&mut out);
        assert_eq!(n, 12);
        assert_eq!(&out[..n], b"second line\n");
    }

    #[test]
    fn busy_ring_is_skipped_not_waited_on() {
        let ring: KmsgRing<16> = KmsgRing::new();
        ring.append(b"x");
        let held = ring.bytes.lock();
        assert!(!ring.append(b"y"));
        let mut out = [0u8; 4];
        assert_eq!(ring.snapshot(&mut out), 0);
        drop(held);
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn log_records_become_lines() {
        let ring: KmsgRing<256> = KmsgRing::new();
        ring.log(
            &Record::builder()
                .level(log::Level::Warn)
                .target("oom")
                .args(format_args!("killed process {}", 42))
                .build(),
        );
        let mut out = [0u8; 256];
        let n = ring.snapshot(&mut out);
        assert_eq!(&out[..n], b"<WARN>oom: killed process 42\n");
    }

    #[test]
    fn long_records_keep_their_prefix() {
        let ring: KmsgRing<1024> = KmsgRing::new();
        let detail = "\u{e9}".repeat(300);
        ring.log(
            &Record::builder()
                .level(log::Level::Error)
                .target("dumper")
                .args(format_args!("kernel panic: bus fault {detail}"))
                .build(),
        );
        let mut out = [0u8; 1024];
        let n = ring.snapshot(&mut out);
        let text = core::str::from_utf8(&out[..n]).unwrap();
        assert!(text.starts_with("<ERROR>dumper: kernel panic: bus fault \u{e9}"), "{text}");
        assert!(text.ends_with("\u{e9}\n"));
        assert!(n <= LINE_CAPACITY + 1);
        assert!(n >= LINE_CAPACITY);
    }
}
