// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! One-slot sleep/wake primitive.
//!
//! The reader parks on a single integer cell when every queue is empty;
//! a writer that publishes flips the cell from 1 to 0 with a CAS and, on
//! success, wakes the (single) sleeper. A failed CAS means the reader was
//! not sleeping and no wake is needed.
//!
//! On Linux this is a raw futex. Coordination is strictly in-process, so
//! the `_PRIVATE` futex operations apply (no cross-process waiters to
//! reach, and the kernel skips the shared-mapping lookup). Elsewhere the
//! same contract is implemented with a mutex + condvar guarding the cell.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(not(target_os = "linux"))]
use parking_lot::{Condvar, Mutex};

/// Futex-like wait cell.
///
/// Spurious wakeups are allowed: `sleep_if` may return without a matching
/// `wake_one` and callers are expected to re-check their condition.
pub(crate) struct WaitCell {
    cell: AtomicU32,
    #[cfg(not(target_os = "linux"))]
    lock: Mutex<()>,
    #[cfg(not(target_os = "linux"))]
    cond: Condvar,
}

impl WaitCell {
    pub fn new() -> Self {
        Self {
            cell: AtomicU32::new(0),
            #[cfg(not(target_os = "linux"))]
            lock: Mutex::new(()),
            #[cfg(not(target_os = "linux"))]
            cond: Condvar::new(),
        }
    }

    /// Store a new cell value.
    #[inline]
    pub fn set(&self, v: u32) {
        self.cell.store(v, Ordering::SeqCst);
    }

    /// Current cell value.
    #[inline]
    pub fn value(&self) -> u32 {
        self.cell.load(Ordering::SeqCst)
    }

    /// Writer-side claim: flip 1 -> 0. On success the caller owns the
    /// duty to call [`wake_one`](Self::wake_one); on failure the reader
    /// was not sleeping.
    #[inline]
    pub fn claim(&self) -> bool {
        self.cell
            .compare_exchange(1, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Block until woken, but only if the cell still equals `expected`.
    ///
    /// Returns `Ok(())` on wake, on spurious wakeup, and when the value
    /// did not match. Any other OS failure is an implementation error
    /// surfaced as [`Error::Internal`].
    #[cfg(target_os = "linux")]
    pub fn sleep_if(&self, expected: u32) -> Result<()> {
        // SAFETY: the cell address stays valid for the duration of the
        // call (we hold &self) and the value/timeout arguments follow
        // futex(2). FUTEX_WAIT_PRIVATE: in-process waiters only.
        let rc = unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.cell.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                expected,
                std::ptr::null::<libc::timespec>(),
            )
        };
        if rc == 0 {
            return Ok(());
        }
        match std::io::Error::last_os_error().raw_os_error() {
            // value changed before the wait, or interrupted: both fine
            Some(libc::EAGAIN) | Some(libc::EINTR) => Ok(()),
            Some(errno) => Err(Error::Internal(errno)),
            None => Err(Error::Internal(0)),
        }
    }

    /// Wake at most one sleeper.
    #[cfg(target_os = "linux")]
    pub fn wake_one(&self) -> Result<()> {
        // SAFETY: same address discipline as sleep_if.
        let rc = unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.cell.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                1i32,
            )
        };
        if rc < 0 {
            match std::io::Error::last_os_error().raw_os_error() {
                Some(errno) => Err(Error::Internal(errno)),
                None => Err(Error::Internal(0)),
            }
        } else {
            Ok(())
        }
    }

    #[cfg(not(target_os = "linux"))]
    pub fn sleep_if(&self, expected: u32) -> Result<()> {
        let mut guard = self.lock.lock();
        if self.cell.load(Ordering::SeqCst) == expected {
            self.cond.wait(&mut guard);
        }
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    pub fn wake_one(&self) -> Result<()> {
        let _guard = self.lock.lock();
        self.cond.notify_one();
        Ok(())
    }
}
