// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide table of write queues plus the shared reader state.
//!
//! The queue table grows only by append: a slot is filled first, then the
//! published length is bumped with a Release store. The reader walks
//! `0..queues_nr` with an Acquire load and never takes a lock; it learns
//! about growth through the one-shot `reload` signal and rebuilds its
//! fuse on the next tick. Writer-side growth is serialized by
//! `queues_mx`.

use crate::error::{Error, Result};
use crate::level::Level;
use crate::opts::Opts;
use crate::queue::WriteQueue;
use crate::wait::WaitCell;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

/// Pause between drain checks while releasing a queue.
const RELEASE_DRAIN_PAUSE: Duration = Duration::from_micros(100);

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Queue bound to the current thread, tagged with the owning
    /// registry so stale bindings from a torn-down logger are ignored.
    static BINDING: RefCell<Option<Binding>> = const { RefCell::new(None) };
}

struct Binding {
    registry_id: u64,
    queue: Arc<WriteQueue>,
}

pub(crate) struct Registry {
    /// Append-only queue table of fixed capacity `queues_max`.
    queues: Box<[OnceLock<Arc<WriteQueue>>]>,
    queues_nr: AtomicUsize,
    /// Serializes writer-side growth of the table.
    queues_mx: Mutex<()>,
    default_lines_nr: usize,
    level_min: Level,
    opts: Opts,
    /// Cleared to request reader exit after draining.
    running: AtomicBool,
    /// Diagnostic: last reader observation was "all queues empty".
    empty: AtomicBool,
    /// One-shot "queue set changed" signal to the reader.
    reload: AtomicU32,
    /// Reader park/wake cell.
    wait: WaitCell,
    id: u64,
}

impl Registry {
    pub fn new(
        queues_max: usize,
        default_lines_nr: usize,
        level_min: Level,
        opts: Opts,
    ) -> Result<Self> {
        if queues_max == 0 || default_lines_nr == 0 {
            return Err(Error::InvalidArgument);
        }
        let mut queues = Vec::with_capacity(queues_max);
        queues.resize_with(queues_max, OnceLock::new);
        Ok(Self {
            queues: queues.into_boxed_slice(),
            queues_nr: AtomicUsize::new(0),
            queues_mx: Mutex::new(()),
            default_lines_nr,
            level_min,
            opts,
            running: AtomicBool::new(true),
            empty: AtomicBool::new(false),
            reload: AtomicU32::new(0),
            wait: WaitCell::new(),
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
        })
    }

    #[inline]
    pub fn wait(&self) -> &WaitCell {
        &self.wait
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub fn set_empty(&self, empty: bool) {
        self.empty.store(empty, Ordering::Relaxed);
    }

    pub fn is_empty_observed(&self) -> bool {
        self.empty.load(Ordering::Relaxed)
    }

    /// Consume the reload signal. True when a reload was pending.
    pub fn take_reload(&self) -> bool {
        self.reload
            .compare_exchange(1, 0, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    fn signal_reload(&self) {
        let _ = self
            .reload
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Relaxed);
    }

    #[inline]
    pub fn queues_nr(&self) -> usize {
        self.queues_nr.load(Ordering::Acquire)
    }

    /// Queue at `index`, `None` past the published length.
    pub fn queue(&self, index: usize) -> Option<&Arc<WriteQueue>> {
        if index >= self.queues_nr() {
            return None;
        }
        self.queues[index].get()
    }

    /// Records dropped so far, summed over every queue.
    pub fn lost_total(&self) -> u64 {
        (0..self.queues_nr())
            .filter_map(|i| self.queue(i))
            .map(|q| q.lost_total())
            .sum()
    }

    // --- binding ---

    /// Bind a queue to the calling thread, reusing a released one when
    /// possible. A second call from an already-bound thread is a no-op.
    ///
    /// `lines_max = 0` requests the registry default.
    pub fn assign_current(&self, lines_max: usize, opts: Opts) -> Result<Arc<WriteQueue>> {
        if let Some(queue) = self.current_binding() {
            return Ok(queue);
        }
        let lines = if lines_max == 0 {
            self.default_lines_nr
        } else {
            lines_max
        };
        let effective = if opts == Opts::NONE { self.opts } else { opts };

        let queue = loop {
            if self.opts.contains(Opts::NOQUEUE) {
                // reuse opted out: always a fresh queue
                break self.alloc_queue(lines, effective)?;
            }
            match self.best_fit_free(lines) {
                Some(candidate) => {
                    if candidate.try_claim() {
                        candidate.bind(effective);
                        log::debug!(
                            "fuselog: <{}> reusing queue {} ({} lines for {} requested)",
                            candidate.thread_name(),
                            candidate.queue_idx(),
                            candidate.capacity(),
                            lines
                        );
                        break candidate;
                    }
                    // lost the race against another binding thread
                    log::debug!("fuselog: queue reuse race, rescanning");
                }
                None => break self.alloc_queue(lines, effective)?,
            }
        };

        BINDING.with(|binding| {
            *binding.borrow_mut() = Some(Binding {
                registry_id: self.id,
                queue: Arc::clone(&queue),
            });
        });
        Ok(queue)
    }

    /// Drain the bound queue, return it to the free pool and clear the
    /// thread-local binding.
    pub fn release_current(&self) -> Result<()> {
        let Some(queue) = self.take_binding() else {
            return Err(Error::InvalidArgument);
        };
        log::debug!(
            "fuselog: <{}> releasing queue {}",
            queue.thread_name(),
            queue.queue_idx()
        );
        while !queue.drained() {
            queue.wake_reader(&self.wait)?;
            thread::sleep(RELEASE_DRAIN_PAUSE);
        }
        queue.set_free();
        Ok(())
    }

    /// Queue bound to the calling thread by this registry, if any.
    pub fn current_binding(&self) -> Option<Arc<WriteQueue>> {
        BINDING.with(|binding| {
            binding
                .borrow()
                .as_ref()
                .filter(|b| b.registry_id == self.id)
                .map(|b| Arc::clone(&b.queue))
        })
    }

    fn take_binding(&self) -> Option<Arc<WriteQueue>> {
        BINDING.with(|binding| {
            let mut slot = binding.borrow_mut();
            let ours = slot.as_ref().map_or(false, |b| b.registry_id == self.id);
            if ours {
                slot.take().map(|b| b.queue)
            } else {
                None
            }
        })
    }

    /// Smallest free queue whose capacity covers the request.
    fn best_fit_free(&self, lines: usize) -> Option<Arc<WriteQueue>> {
        let mut best: Option<&Arc<WriteQueue>> = None;
        for i in 0..self.queues_nr() {
            let Some(queue) = self.queue(i) else { continue };
            if !queue.is_free() || queue.capacity() < lines {
                continue;
            }
            if best.map_or(true, |b| queue.capacity() < b.capacity()) {
                best = Some(queue);
            }
        }
        best.cloned()
    }

    /// Append a fresh queue, claimed for the calling thread.
    fn alloc_queue(&self, lines: usize, opts: Opts) -> Result<Arc<WriteQueue>> {
        let lines = lines.max(self.default_lines_nr);
        let queue = {
            let _guard = self.queues_mx.lock();
            let nr = self.queues_nr.load(Ordering::Relaxed);
            if nr == self.queues.len() {
                return Err(Error::CapacityExhausted);
            }
            let queue = Arc::new(WriteQueue::new(nr, lines, opts));
            queue.bind(opts);
            // the slot is empty (append-only table) and we hold the mutex
            let _ = self.queues[nr].set(Arc::clone(&queue));
            self.queues_nr.store(nr + 1, Ordering::Release);
            queue
        };
        self.signal_reload();
        log::debug!(
            "fuselog: <{}> new queue {} allocated ({} lines)",
            queue.thread_name(),
            queue.queue_idx(),
            queue.capacity()
        );
        Ok(queue)
    }

    // --- logging entry point ---

    /// The writer hot path: running check, level filter, auto-bind,
    /// publish.
    pub fn log(
        &self,
        level: Level,
        file: &'static str,
        func: &'static str,
        line: u32,
        args: fmt::Arguments<'_>,
    ) -> Result<()> {
        if !self.is_running() {
            return Err(Error::ShutDown);
        }
        if level > self.level_min {
            return Ok(());
        }
        let queue = match self.current_binding() {
            Some(queue) => queue,
            None => self.assign_current(0, Opts::NONE)?,
        };
        queue.try_publish(&self.wait, level, file, func, line, args)
    }
}
