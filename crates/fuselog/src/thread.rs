// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer thread wrapper.
//!
//! Spawns a named thread with a write queue bound before the payload
//! runs and released when the thread exits, panic included. The OS
//! thread name is set by the spawn, so the bind-time capture sees it.

use crate::error::Result;
use crate::logger::Logger;
use crate::opts::Opts;
use crate::registry::Registry;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Releases the bound queue when the thread exits, however it exits.
struct ReleaseGuard(Arc<Registry>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.release_current() {
            log::debug!("fuselog: writer exit without a bound queue ({e})");
        }
    }
}

/// Spawn a writer thread with its own write queue.
///
/// The queue is bound before `f` runs (`lines_max = 0` uses the
/// configured default) and drained + released when `f` returns or
/// panics. The join result carries the bind error, if any; `f` does not
/// run in that case.
pub fn spawn_writer<F, T>(
    logger: &Logger,
    name: &str,
    lines_max: usize,
    opts: Opts,
    f: F,
) -> io::Result<JoinHandle<Result<T>>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let registry = logger.registry_arc();
    thread::Builder::new().name(name.to_string()).spawn(move || {
        registry.assign_current(lines_max, opts)?;
        let _guard = ReleaseGuard(Arc::clone(&registry));
        Ok(f())
    })
}
