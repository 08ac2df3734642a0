// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-queue and registry-wide option flags.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Option flags, combinable with `|`.
///
/// `Opts::NONE` on a queue request means "inherit the registry defaults".
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Opts(u32);

impl Opts {
    /// No options, use default values.
    pub const NONE: Opts = Opts(0);
    /// Drop the record (and report `WouldBlock`) when the queue is full
    /// instead of waiting for the reader.
    pub const NONBLOCK: Opts = Opts(1 << 0);
    /// Publish a summary record as soon as there is free space again
    /// after records were lost.
    pub const PRINTLOST: Opts = Opts(1 << 1);
    /// Touch every slot page at queue creation so the hot path never
    /// takes a soft page fault.
    pub const PREALLOC: Opts = Opts(1 << 2);
    /// Opt out of per-thread queue reuse: every bind allocates a fresh
    /// queue and released queues are not offered to later binds.
    pub const NOQUEUE: Opts = Opts(1 << 3);

    /// True when every flag of `other` is set in `self`.
    #[inline]
    #[must_use]
    pub fn contains(self, other: Opts) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw flag bits.
    #[inline]
    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Rebuild from raw bits (unknown bits are kept).
    #[inline]
    #[must_use]
    pub fn from_bits(bits: u32) -> Opts {
        Opts(bits)
    }
}

impl BitOr for Opts {
    type Output = Opts;

    fn bitor(self, rhs: Opts) -> Opts {
        Opts(self.0 | rhs.0)
    }
}

impl BitOrAssign for Opts {
    fn bitor_assign(&mut self, rhs: Opts) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Opts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "NONE");
        }
        let mut first = true;
        for (flag, name) in [
            (Opts::NONBLOCK, "NONBLOCK"),
            (Opts::PRINTLOST, "PRINTLOST"),
            (Opts::PREALLOC, "PREALLOC"),
            (Opts::NOQUEUE, "NOQUEUE"),
        ] {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}
