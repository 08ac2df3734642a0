// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reader thread: k-way time-ordered merge over all write queues.
//!
//! One tick of the loop:
//! 1. Release the head emitted on the previous tick, pull the queue's
//!    next record into the fuse, re-sort incrementally.
//! 2. Re-poll the queues whose fuse entry is empty (they sit at the
//!    sorted tail).
//! 3. Honor a pending `reload` by rebuilding the fuse from the current
//!    queue table.
//! 4. All empty: spin down through a short exponential back-off, then
//!    park on the wait cell. Writers prevent or undo the park with the
//!    `waiting` CAS, so no record can be stranded behind a sleep.
//! 5. Otherwise emit `fuse[0]` through the formatter to the sink.
//!
//! A failing sink loses that one line but never stalls the producers:
//! the slot is still released and the failure goes to the `log` facade.

use crate::format::{Formatter, Theme};
use crate::fuse::{bubble_down, bubble_up, FuseEntry, FUSE_EMPTY};
use crate::output::Output;
use crate::registry::Registry;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Rounds of exponential back-off (1, 2, 4, 8, 16 us) before parking.
const EMPTY_SPIN_ROUNDS: u32 = 5;

/// Body of the reader thread. Returns when the registry is shut down
/// and every queue has been drained, or on a wait-primitive failure.
pub(crate) fn reader_main(registry: Arc<Registry>, mut output: Box<dyn Output>, theme: &'static Theme) {
    let mut formatter = Formatter::new(theme);
    log::debug!("fuselog: reader starting");

    'outer: loop {
        let fuse_nr = registry.queues_nr();
        if fuse_nr == 0 {
            // nothing to merge yet; park until the first writer shows up
            registry.wait().set(1);
            if !park(&registry) {
                break;
            }
            if !registry.is_running() && registry.queues_nr() == 0 {
                break;
            }
            registry.take_reload();
            continue;
        }

        log::debug!("fuselog: reader (re)loading {fuse_nr} queue(s)");
        let mut fuse: Vec<FuseEntry> = (0..fuse_nr)
            .filter_map(|i| registry.queue(i))
            .map(|q| FuseEntry::new(Arc::clone(q)))
            .collect();
        let mut empty_nr = fuse.len();
        let mut really_empty = 0u32;
        let mut emitted_pending = false;

        loop {
            // 1. free the head emitted on the previous tick and refill
            if emitted_pending {
                emitted_pending = false;
                fuse[0].queue.release_head();
                if fuse[0].refill() {
                    empty_nr += 1;
                }
                bubble_up(&mut fuse);
            }

            // 2. anything new in the queues currently marked empty?
            let mut still_empty = 0;
            let last = fuse.len() - 1;
            for _ in 0..empty_nr {
                if fuse[last].refill() {
                    still_empty += 1;
                }
                bubble_down(&mut fuse);
            }
            empty_nr = still_empty;

            // 3. queue set changed: rebuild the fuse
            if registry.take_reload() {
                continue 'outer;
            }

            // 4. all queues empty
            if fuse[0].key == FUSE_EMPTY {
                registry.set_empty(true);
                if !registry.is_running() {
                    // drained; we only terminate on empty queues
                    break 'outer;
                }
                if really_empty < EMPTY_SPIN_ROUNDS {
                    // double-check a few times before the (costly) park:
                    // bursts tend to refill the queues within microseconds
                    let wait_us = 1u64 << really_empty;
                    really_empty += 1;
                    thread::sleep(Duration::from_micros(wait_us));
                    continue;
                }
                really_empty = 0;
                registry.wait().set(1);
                if !park(&registry) {
                    break 'outer;
                }
                continue;
            }
            registry.set_empty(false);
            really_empty = 0;

            // 5. emit the globally smallest stamp
            let queue = &fuse[0].queue;
            // SAFETY: a non-EMPTY fuse key means the head was observed
            // ready with Acquire; the reader owns the slot fields until
            // release_head() on the next tick.
            let data = unsafe { &*queue.head().cell() };
            let name = queue.thread_name();
            let line = formatter.format_line(&name, data);
            if let Err(e) = output.write_line(line) {
                // losing one line beats stalling every producer
                log::warn!("fuselog: sink write failed, line dropped: {e}");
            }
            emitted_pending = true;
        }
    }

    // make later log() calls fail fast even after an abnormal exit
    registry.set_running(false);
    if let Err(e) = output.flush() {
        log::warn!("fuselog: sink flush failed: {e}");
    }
    log::debug!("fuselog: reader exit");
}

/// Park on the wait cell. False means the primitive failed and the
/// reader must terminate.
fn park(registry: &Registry) -> bool {
    match registry.wait().sleep_if(1) {
        Ok(()) => true,
        Err(e) => {
            log::error!("fuselog: wait primitive failed, reader terminating: {e}");
            false
        }
    }
}
