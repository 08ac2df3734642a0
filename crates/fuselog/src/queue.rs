// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-thread write queue.
//!
//! Fixed-capacity single-producer / single-consumer ring of [`Record`]s,
//! bound to exactly one writer thread at a time. Wait-free for the writer
//! on the common path: one ready-flag check, the field stores, one Release
//! publish, one CAS to poke the reader.
//!
//! # Synchronization Protocol
//!
//! Writer publish:
//! 1. `i = wr_seq % N`; if `slots[i].ready` the ring is full (policy below)
//! 2. Stamp clocks, write level/source/message into the slot
//! 3. Commit: `ready = true` (Release)
//! 4. `wr_seq += 1`
//! 5. CAS `waiting: 1 -> 0`; on success wake the reader
//!
//! Reader consume:
//! 1. `slots[rd_seq % N].ready` (Acquire) gates access to the fields
//! 2. After emission: `ready = false` (Release), `rd_seq += 1`
//!
//! Invariant: `wr_seq - rd_seq` stays in `[0, N]`.

use crate::error::{Error, Result};
use crate::level::Level;
use crate::opts::Opts;
use crate::record::{current_thread_name, mono_now_ns, wall_now_ns, Record, TruncWriter};
use crate::wait::WaitCell;
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Pause before re-checking a full ring in blocking mode.
const FULL_RETRY_BLOCKING: Duration = Duration::from_micros(50);
/// Single grace pause granted to the reader in non-blocking mode.
const FULL_RETRY_NONBLOCK: Duration = Duration::from_micros(1);

/// Single-producer / single-consumer ring of log records.
///
/// `wr_seq` is advanced only by the bound writer thread, `rd_seq` only by
/// the reader; both are atomics so the release drain can observe them
/// from the writer side.
pub(crate) struct WriteQueue {
    slots: Box<[Record]>,
    queue_idx: usize,
    wr_seq: AtomicU64,
    rd_seq: AtomicU64,
    /// True while the queue is not bound to any writer thread.
    free: AtomicBool,
    /// Writer thread name captured at bind time, read lock-free by the
    /// reader while formatting.
    thread_name: ArcSwap<String>,
    opts: AtomicU32,
    /// Records dropped since the last lost-summary record.
    lost: AtomicU64,
    /// Records dropped over the queue lifetime.
    lost_total: AtomicU64,
}

impl WriteQueue {
    /// Create a queue of `lines_nr` slots, claimed for the creating
    /// thread (`free = false`).
    pub fn new(queue_idx: usize, lines_nr: usize, opts: Opts) -> Self {
        debug_assert!(lines_nr >= 1);
        let mut slots = Vec::with_capacity(lines_nr);
        slots.resize_with(lines_nr, Record::new);
        let queue = Self {
            slots: slots.into_boxed_slice(),
            queue_idx,
            wr_seq: AtomicU64::new(0),
            rd_seq: AtomicU64::new(0),
            free: AtomicBool::new(false),
            thread_name: ArcSwap::from_pointee(String::new()),
            opts: AtomicU32::new(opts.bits()),
            lost: AtomicU64::new(0),
            lost_total: AtomicU64::new(0),
        };
        if opts.contains(Opts::PREALLOC) {
            queue.prealloc();
        }
        queue
    }

    /// Touch every slot page so the kernel materializes them now instead
    /// of faulting in the middle of a publish.
    fn prealloc(&self) {
        for slot in self.slots.iter() {
            // SAFETY: the queue is not shared yet, we are the only accessor.
            let data = unsafe { &mut *slot.cell() };
            let mut i = 0;
            while i < data.msg.len() {
                // SAFETY: i is in bounds; volatile so the store survives
                // the optimizer even though the value is already zero.
                unsafe { std::ptr::write_volatile(data.msg.as_mut_ptr().add(i), 0) };
                i += 4096;
            }
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn queue_idx(&self) -> usize {
        self.queue_idx
    }

    #[inline]
    pub fn opts(&self) -> Opts {
        Opts::from_bits(self.opts.load(Ordering::Relaxed))
    }

    pub fn lost_total(&self) -> u64 {
        self.lost_total.load(Ordering::Relaxed) + self.lost.load(Ordering::Relaxed)
    }

    pub fn thread_name(&self) -> Arc<String> {
        self.thread_name.load_full()
    }

    // --- bind lifecycle (writer side, serialized by the registry) ---

    #[inline]
    pub fn is_free(&self) -> bool {
        self.free.load(Ordering::Acquire)
    }

    /// Claim a free queue. Losing the race returns `false`.
    pub fn try_claim(&self) -> bool {
        self.free
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Record the binding thread's name and effective options.
    pub fn bind(&self, opts: Opts) {
        self.thread_name.store(Arc::new(current_thread_name()));
        self.opts.store(opts.bits(), Ordering::Relaxed);
    }

    /// Return the queue to the free pool. The caller must have drained it.
    pub fn set_free(&self) {
        self.free.store(true, Ordering::Release);
    }

    /// True when the reader consumed everything the writer published.
    pub fn drained(&self) -> bool {
        self.rd_seq.load(Ordering::Acquire) == self.wr_seq.load(Ordering::Acquire)
    }

    // --- writer side ---

    /// Publish one record, formatting `args` straight into the slot
    /// buffer. Never allocates.
    pub fn try_publish(
        &self,
        wait: &WaitCell,
        level: Level,
        file: &'static str,
        func: &'static str,
        line: u32,
        args: fmt::Arguments<'_>,
    ) -> Result<()> {
        loop {
            let seq = self.wr_seq.load(Ordering::Relaxed);
            let slot = &self.slots[(seq % self.slots.len() as u64) as usize];
            self.wait_for_slot(slot, wait)?;

            if self.opts().contains(Opts::PRINTLOST) && self.lost.load(Ordering::Relaxed) > 0 {
                let lost = self.lost.swap(0, Ordering::Relaxed);
                let total = self.lost_total.fetch_add(lost, Ordering::Relaxed) + lost;
                self.fill_and_publish(
                    slot,
                    seq,
                    wait,
                    Level::Oops,
                    file!(),
                    module_path!(),
                    line!(),
                    format_args!("Lost {lost} log line(s) ({total} so far) !"),
                )?;
                // the user record goes into the next slot
                continue;
            }

            return self.fill_and_publish(slot, seq, wait, level, file, func, line, args);
        }
    }

    /// Full-ring policy. Blocking mode pokes the reader and retries until
    /// a slot frees up; non-blocking mode grants the reader one short
    /// pause, then counts the record lost.
    fn wait_for_slot(&self, slot: &Record, wait: &WaitCell) -> Result<()> {
        if !slot.is_ready() {
            return Ok(());
        }
        let nonblock = self.opts().contains(Opts::NONBLOCK);
        let mut retried = false;
        while slot.is_ready() {
            log::debug!(
                "fuselog: queue {} full ({} lines)",
                self.queue_idx,
                self.slots.len()
            );
            self.wake_reader(wait)?;
            if nonblock {
                if retried {
                    self.lost.fetch_add(1, Ordering::Relaxed);
                    log::debug!(
                        "fuselog: queue {} dropped one line ({} since last report)",
                        self.queue_idx,
                        self.lost.load(Ordering::Relaxed)
                    );
                    return Err(Error::WouldBlock);
                }
                retried = true;
                thread::sleep(FULL_RETRY_NONBLOCK);
            } else {
                thread::sleep(FULL_RETRY_BLOCKING);
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn fill_and_publish(
        &self,
        slot: &Record,
        seq: u64,
        wait: &WaitCell,
        level: Level,
        file: &'static str,
        func: &'static str,
        line: u32,
        args: fmt::Arguments<'_>,
    ) -> Result<()> {
        // SAFETY: `slot` was observed not ready and this thread is the
        // sole bound writer, so the slot fields are exclusively ours
        // until the publish below.
        unsafe {
            let data = &mut *slot.cell();
            data.mono_ns = mono_now_ns();
            data.wall_ns = wall_now_ns();
            data.level = level;
            data.file = file;
            data.func = func;
            data.line = line;
            let mut w = TruncWriter::new(&mut data.msg);
            let _ = fmt::Write::write_fmt(&mut w, args);
            data.msg_len = w.written() as u16;
        }
        slot.publish();
        self.wr_seq.store(seq + 1, Ordering::Release);
        self.wake_reader(wait)
    }

    /// CAS `waiting: 1 -> 0`; on success the reader was parked and we owe
    /// it a wake.
    pub fn wake_reader(&self, wait: &WaitCell) -> Result<()> {
        if wait.claim() {
            log::debug!("fuselog: queue {} waking the reader", self.queue_idx);
            wait.wake_one()?;
        }
        Ok(())
    }

    // --- reader side ---

    #[inline]
    fn rd_idx(&self) -> usize {
        (self.rd_seq.load(Ordering::Relaxed) % self.slots.len() as u64) as usize
    }

    /// Sort key of the head record, if one is ready.
    pub fn head_ready_ns(&self) -> Option<u64> {
        let slot = &self.slots[self.rd_idx()];
        if slot.is_ready() {
            // SAFETY: ready observed true with Acquire, the fields are
            // fully initialized and owned by the reader.
            Some(unsafe { (*slot.cell()).mono_ns })
        } else {
            None
        }
    }

    /// Borrow the head slot. Only meaningful after
    /// [`head_ready_ns`](Self::head_ready_ns) returned `Some`.
    pub fn head(&self) -> &Record {
        &self.slots[self.rd_idx()]
    }

    /// Hand the head slot back to the writer and advance the cursor.
    pub fn release_head(&self) {
        let seq = self.rd_seq.load(Ordering::Relaxed);
        self.slots[(seq % self.slots.len() as u64) as usize].release();
        self.rd_seq.store(seq + 1, Ordering::Release);
    }

    /// Publish with a caller-chosen sort key, bypassing the clock.
    /// Blocks (spinning) while the ring is full.
    #[cfg(test)]
    pub fn publish_with_stamp(&self, wait: &WaitCell, mono_ns: u64, msg: &str) {
        loop {
            let seq = self.wr_seq.load(Ordering::Relaxed);
            let slot = &self.slots[(seq % self.slots.len() as u64) as usize];
            if slot.is_ready() {
                let _ = self.wake_reader(wait);
                thread::sleep(Duration::from_micros(10));
                continue;
            }
            // SAFETY: slot not ready, single writer (test discipline)
            unsafe {
                let data = &mut *slot.cell();
                data.mono_ns = mono_ns;
                data.wall_ns = wall_now_ns();
                data.level = Level::Info;
                data.file = file!();
                data.func = module_path!();
                data.line = line!();
                let mut w = TruncWriter::new(&mut data.msg);
                let _ = fmt::Write::write_fmt(&mut w, format_args!("{msg}"));
                data.msg_len = w.written() as u16;
            }
            slot.publish();
            self.wr_seq.store(seq + 1, Ordering::Release);
            let _ = self.wake_reader(wait);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consume_msg(queue: &WriteQueue) -> Option<String> {
        queue.head_ready_ns()?;
        // SAFETY: head observed ready
        let msg = unsafe {
            String::from_utf8_lossy((*queue.head().cell()).msg_bytes()).into_owned()
        };
        queue.release_head();
        Some(msg)
    }

    fn publish(queue: &WriteQueue, wait: &WaitCell, level: Level, msg: &str) -> Result<()> {
        queue.try_publish(wait, level, file!(), module_path!(), line!(), format_args!("{msg}"))
    }

    #[test]
    fn test_publish_consume_fifo() {
        let wait = WaitCell::new();
        let queue = WriteQueue::new(0, 4, Opts::NONE);

        for i in 0..3 {
            publish(&queue, &wait, Level::Info, &format!("m{i}")).unwrap();
        }
        assert_eq!(consume_msg(&queue).as_deref(), Some("m0"));
        assert_eq!(consume_msg(&queue).as_deref(), Some("m1"));
        assert_eq!(consume_msg(&queue).as_deref(), Some("m2"));
        assert!(consume_msg(&queue).is_none());
        assert!(queue.drained());
    }

    #[test]
    fn test_seq_window_invariant() {
        let wait = WaitCell::new();
        let queue = WriteQueue::new(0, 4, Opts::NONBLOCK);

        for i in 0..16 {
            let _ = publish(&queue, &wait, Level::Info, &format!("m{i}"));
            let wr = queue.wr_seq.load(Ordering::Relaxed);
            let rd = queue.rd_seq.load(Ordering::Relaxed);
            assert!(wr - rd <= 4, "window {}", wr - rd);
            if i % 3 == 0 {
                consume_msg(&queue);
            }
        }
    }

    #[test]
    fn test_single_slot_ring_alternates() {
        let wait = WaitCell::new();
        let queue = WriteQueue::new(0, 1, Opts::NONBLOCK);

        for i in 0..5 {
            publish(&queue, &wait, Level::Info, &format!("m{i}")).unwrap();
            assert_eq!(consume_msg(&queue).as_deref(), Some(format!("m{i}").as_str()));
        }
    }

    #[test]
    fn test_nonblock_drops_when_full() {
        let wait = WaitCell::new();
        let queue = WriteQueue::new(0, 2, Opts::NONBLOCK);

        publish(&queue, &wait, Level::Info, "a").unwrap();
        publish(&queue, &wait, Level::Info, "b").unwrap();
        assert_eq!(
            publish(&queue, &wait, Level::Info, "c"),
            Err(Error::WouldBlock)
        );
        assert_eq!(queue.lost_total(), 1);

        // space frees up, publishing works again
        assert_eq!(consume_msg(&queue).as_deref(), Some("a"));
        publish(&queue, &wait, Level::Info, "d").unwrap();
    }

    #[test]
    fn test_printlost_summary_precedes_user_record() {
        let wait = WaitCell::new();
        let queue = WriteQueue::new(0, 2, Opts::NONBLOCK | Opts::PRINTLOST);

        publish(&queue, &wait, Level::Info, "a").unwrap();
        publish(&queue, &wait, Level::Info, "b").unwrap();
        for _ in 0..3 {
            assert_eq!(
                publish(&queue, &wait, Level::Info, "x"),
                Err(Error::WouldBlock)
            );
        }

        // drain, then publish one more: the summary must come first
        assert_eq!(consume_msg(&queue).as_deref(), Some("a"));
        assert_eq!(consume_msg(&queue).as_deref(), Some("b"));
        publish(&queue, &wait, Level::Info, "after").unwrap();

        let summary = consume_msg(&queue).expect("summary record");
        assert!(summary.contains("Lost 3 log line(s)"), "{summary}");
        assert_eq!(consume_msg(&queue).as_deref(), Some("after"));
        assert_eq!(queue.lost_total(), 3);
    }

    #[test]
    fn test_long_message_truncated() {
        use crate::record::LINE_SZ;
        let wait = WaitCell::new();
        let queue = WriteQueue::new(0, 1, Opts::NONE);

        let long = "y".repeat(LINE_SZ * 2);
        publish(&queue, &wait, Level::Info, &long).unwrap();
        let msg = consume_msg(&queue).unwrap();
        assert_eq!(msg.len(), LINE_SZ - 1);
    }

    #[test]
    fn test_claim_and_free_cycle() {
        let queue = WriteQueue::new(0, 2, Opts::NONE);
        assert!(!queue.is_free());
        assert!(!queue.try_claim());

        queue.set_free();
        assert!(queue.is_free());
        assert!(queue.try_claim());
        assert!(!queue.is_free());
    }

    #[test]
    fn test_bind_captures_thread_name() {
        let queue = WriteQueue::new(0, 2, Opts::NONE);
        let handle = thread::Builder::new()
            .name("w0-bind-test-very-long".into())
            .spawn(move || {
                queue.bind(Opts::NONBLOCK);
                (queue.thread_name().to_string(), queue.opts())
            })
            .unwrap();
        let (name, opts) = handle.join().unwrap();
        assert_eq!(name, "w0-bind-test-ve"); // 15 bytes max
        assert!(opts.contains(Opts::NONBLOCK));
    }
}
