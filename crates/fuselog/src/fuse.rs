// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reader-side fuse array.
//!
//! One entry per write queue, holding the sort key of that queue's head
//! record (`FUSE_EMPTY` when the head is not ready). The array is kept
//! sorted ascending, so `fuse[0]` is either the globally smallest stamp
//! or `FUSE_EMPTY` when every queue is empty.
//!
//! Only one key changes per emitted record, so a full re-sort is never
//! needed: [`bubble_up`] re-places a grown head key, [`bubble_down`]
//! re-places a refilled tail entry. Both are O(k) worst case and O(1)
//! when stamps are nearly monotonic per queue, the usual case.

use crate::queue::WriteQueue;
use std::sync::Arc;

/// Key of an entry whose queue has no ready head.
pub(crate) const FUSE_EMPTY: u64 = u64::MAX;

/// One merge slot: current head key + owning queue.
pub(crate) struct FuseEntry {
    pub key: u64,
    pub queue: Arc<WriteQueue>,
}

impl FuseEntry {
    pub fn new(queue: Arc<WriteQueue>) -> Self {
        Self {
            key: FUSE_EMPTY,
            queue,
        }
    }

    /// Re-read the head key from the queue. Returns `true` when the
    /// entry is (still) empty.
    pub fn refill(&mut self) -> bool {
        self.key = self.queue.head_ready_ns().unwrap_or(FUSE_EMPTY);
        self.key == FUSE_EMPTY
    }
}

/// Move a grown `fuse[0]` towards the tail until sorted again.
///
/// Strictly-greater keys move up, so an entry that became `FUSE_EMPTY`
/// ends behind every real stamp.
pub(crate) fn bubble_up(fuse: &mut [FuseEntry]) {
    let mut i = 0;
    while i + 1 < fuse.len() && fuse[i].key > fuse[i + 1].key {
        fuse.swap(i, i + 1);
        i += 1;
    }
}

/// Move a shrunk tail entry towards the head until sorted again.
///
/// The predicate is `<=`: a refilled entry passes equal keys, which
/// stacks the remaining empty entries behind equal-smaller groups and
/// keeps refill order stable for ties.
pub(crate) fn bubble_down(fuse: &mut [FuseEntry]) {
    if fuse.is_empty() {
        return;
    }
    let mut i = fuse.len() - 1;
    while i > 0 && fuse[i].key <= fuse[i - 1].key {
        fuse.swap(i, i - 1);
        i -= 1;
    }
}
