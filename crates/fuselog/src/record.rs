// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Log record slot.
//!
//! A `Record` is one slot of a write queue ring. The `ready` flag is the
//! sole synchronization handle for the slot:
//!
//! - the bound writer thread owns all other fields while `ready = false`
//!   and hands them over with a Release store of `true`;
//! - the reader thread owns them while `ready = true` (Acquire load) and
//!   hands the slot back with a Release store of `false`.
//!
//! Everything behind the flag is plain data in an `UnsafeCell`, so the
//! hot path is a handful of field stores plus one atomic. No per-slot
//! mutex: the cost of one would be the very thing this design avoids.

use crate::level::Level;
use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Maximum size of one formatted message, terminator included.
/// Longer messages are truncated at a character boundary.
pub const LINE_SZ: usize = 1024;

/// Plain record fields, valid only as allowed by `Record::ready`.
pub(crate) struct RecordData {
    /// Monotonic stamp taken at publication, the merge sort key.
    pub mono_ns: u64,
    /// Wall-clock stamp carried alongside, display only.
    pub wall_ns: u64,
    pub level: Level,
    pub file: &'static str,
    pub func: &'static str,
    pub line: u32,
    pub msg_len: u16,
    pub msg: [u8; LINE_SZ],
}

impl RecordData {
    pub(crate) fn empty() -> Self {
        Self {
            mono_ns: 0,
            wall_ns: 0,
            level: Level::Trace,
            file: "",
            func: "",
            line: 0,
            msg_len: 0,
            msg: [0u8; LINE_SZ],
        }
    }

    /// Message bytes written so far.
    pub fn msg_bytes(&self) -> &[u8] {
        &self.msg[..self.msg_len as usize]
    }
}

/// One slot of a write queue ring.
pub(crate) struct Record {
    ready: AtomicBool,
    data: UnsafeCell<RecordData>,
}

// SAFETY: Record is shared between exactly one writer and one reader.
// The `ready` flag (Release on publish, Acquire on consume) orders every
// access to the UnsafeCell contents; writer and reader never hold the
// data at the same time.
unsafe impl Send for Record {}
unsafe impl Sync for Record {}

impl Record {
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            data: UnsafeCell::new(RecordData::empty()),
        }
    }

    /// Check the handshake flag.
    ///
    /// Acquire pairs with the Release in [`publish`](Self::publish): a
    /// reader that observes `true` also observes every field write that
    /// preceded it.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Raw access to the slot fields. Callers must hold the side of the
    /// `ready` handshake that currently owns the slot.
    #[inline]
    pub fn cell(&self) -> *mut RecordData {
        self.data.get()
    }

    /// Hand the slot to the reader. Release ordering makes all prior
    /// field writes visible to the Acquire load in [`is_ready`](Self::is_ready).
    #[inline]
    pub fn publish(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Hand the slot back to the writer.
    #[inline]
    pub fn release(&self) {
        self.ready.store(false, Ordering::Release);
    }
}

/// Monotonic nanoseconds since the first call in this process.
#[inline]
pub(crate) fn mono_now_ns() -> u64 {
    static BASE: OnceLock<Instant> = OnceLock::new();
    let base = *BASE.get_or_init(Instant::now);
    base.elapsed().as_nanos() as u64
}

/// Wall-clock nanoseconds since the Unix epoch.
#[inline]
pub(crate) fn wall_now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos() as u64)
}

/// Name of the calling thread, truncated to the 15 bytes an OS thread
/// name can carry; unnamed threads get their stringified thread id.
pub(crate) fn current_thread_name() -> String {
    let current = std::thread::current();
    match current.name() {
        Some(name) if !name.is_empty() => {
            let mut cut = name.len().min(15);
            while cut > 0 && !name.is_char_boundary(cut) {
                cut -= 1;
            }
            name[..cut].to_string()
        }
        _ => {
            // "ThreadId(12)" -> "12"
            let id = format!("{:?}", current.id());
            id.chars().filter(char::is_ascii_digit).collect()
        }
    }
}

/// `fmt::Write` adapter that fills a fixed byte buffer and silently
/// truncates at the last full character that fits.
pub(crate) struct TruncWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> TruncWriter<'a> {
    /// Writes at most `buf.len() - 1` bytes, mirroring a C string buffer
    /// that keeps one byte for the terminator.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    pub fn written(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        self.buf.len() - 1
    }
}

impl fmt::Write for TruncWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let avail = self.capacity() - self.len;
        let take = if s.len() <= avail {
            s.len()
        } else {
            // largest char boundary that still fits
            let mut cut = avail;
            while cut > 0 && !s.is_char_boundary(cut) {
                cut -= 1;
            }
            cut
        };
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn test_publish_release_cycle() {
        let rec = Record::new();
        assert!(!rec.is_ready());

        // SAFETY: single-threaded test, slot not published yet
        unsafe {
            let data = &mut *rec.cell();
            data.level = Level::Info;
            data.msg[..2].copy_from_slice(b"hi");
            data.msg_len = 2;
        }
        rec.publish();
        assert!(rec.is_ready());

        // SAFETY: ready observed true
        let msg = unsafe { (*rec.cell()).msg_bytes().to_vec() };
        assert_eq!(msg, b"hi");

        rec.release();
        assert!(!rec.is_ready());
    }

    #[test]
    fn test_slot_reusable_at_full_size() {
        let rec = Record::new();
        for round in 0u8..3 {
            let fill = vec![b'a' + round; LINE_SZ - 1];
            // SAFETY: single-threaded, slot released between rounds
            unsafe {
                let data = &mut *rec.cell();
                let mut w = TruncWriter::new(&mut data.msg);
                w.write_str(std::str::from_utf8(&fill).unwrap()).unwrap();
                data.msg_len = w.written() as u16;
            }
            rec.publish();
            let len = unsafe { (*rec.cell()).msg_len as usize };
            assert_eq!(len, LINE_SZ - 1);
            rec.release();
        }
    }

    #[test]
    fn test_trunc_writer_exact_fit() {
        let mut buf = [0u8; 8];
        let mut w = TruncWriter::new(&mut buf);
        w.write_str("1234567").unwrap();
        assert_eq!(w.written(), 7);
        assert_eq!(&buf[..7], b"1234567");
    }

    #[test]
    fn test_trunc_writer_truncates() {
        let mut buf = [0u8; 8];
        let mut w = TruncWriter::new(&mut buf);
        w.write_str("12345678many more").unwrap();
        assert_eq!(w.written(), 7);
    }

    #[test]
    fn test_trunc_writer_respects_char_boundary() {
        let mut buf = [0u8; 6];
        let mut w = TruncWriter::new(&mut buf);
        // 'é' is 2 bytes; the 3rd one would only half-fit
        w.write_str("ééé").unwrap();
        assert_eq!(w.written(), 4);
        assert!(std::str::from_utf8(&buf[..4]).is_ok());
    }

    #[test]
    fn test_mono_clock_is_monotonic() {
        let a = mono_now_ns();
        let b = mono_now_ns();
        assert!(b >= a);
    }
}
