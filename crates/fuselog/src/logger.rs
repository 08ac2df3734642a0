// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logger front object and the process-global instance.
//!
//! A [`Logger`] owns one registry and its reader thread; its lifetime
//! bounds the whole pipeline. [`init`]/[`deinit`] manage the single
//! process-global instance used by the level macros; the macros reach it
//! through an `ArcSwapOption` load, so the hot path never takes a lock.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::level::Level;
use crate::opts::Opts;
use crate::reader::reader_main;
use crate::registry::Registry;
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Pause between checks while waiting for the reader to park in deinit.
const DEINIT_SYNC_PAUSE: Duration = Duration::from_micros(100);

static GLOBAL: Mutex<Option<Logger>> = Mutex::new(None);
static GLOBAL_REGISTRY: ArcSwapOption<Registry> = ArcSwapOption::const_empty();

/// A running logger: queue registry + reader thread.
pub struct Logger {
    registry: Arc<Registry>,
    reader: Option<JoinHandle<()>>,
}

impl Logger {
    /// Start a logger: validates the configuration and spawns the
    /// reader thread (`fuselog-reader`).
    pub fn init(config: Config) -> Result<Logger> {
        let registry = Arc::new(Registry::new(
            config.queues_max,
            config.default_lines_nr,
            config.level_min,
            config.opts,
        )?);
        let reader_registry = Arc::clone(&registry);
        let output = config.output;
        let theme = config.theme;
        let reader = thread::Builder::new()
            .name("fuselog-reader".into())
            .spawn(move || reader_main(reader_registry, output, theme))
            .map_err(Error::from)?;
        Ok(Logger {
            registry,
            reader: Some(reader),
        })
    }

    /// Publish one record. Prefer the level macros, which fill in the
    /// source location.
    pub fn log(
        &self,
        level: Level,
        file: &'static str,
        func: &'static str,
        line: u32,
        args: fmt::Arguments<'_>,
    ) -> Result<()> {
        self.registry.log(level, file, func, line, args)
    }

    /// Bind a write queue to the calling thread (`lines_max = 0` uses
    /// the configured default). Idempotent per thread.
    ///
    /// A thread that binds manually and exits without
    /// [`free_write_queue`](Self::free_write_queue) leaks its queue
    /// until teardown; use [`spawn_writer`](crate::spawn_writer) to tie
    /// the release to the thread lifetime.
    pub fn assign_write_queue(&self, lines_max: usize, opts: Opts) -> Result<()> {
        self.registry.assign_current(lines_max, opts).map(|_| ())
    }

    /// Drain and release the calling thread's queue back to the pool.
    pub fn free_write_queue(&self) -> Result<()> {
        self.registry.release_current()
    }

    /// Clone-able handle for writer threads.
    #[must_use]
    pub fn handle(&self) -> LogHandle {
        LogHandle {
            registry: Arc::clone(&self.registry),
        }
    }

    /// Number of queues allocated so far.
    #[must_use]
    pub fn queues_allocated(&self) -> usize {
        self.registry.queues_nr()
    }

    /// Capacity of the queue bound to the calling thread.
    #[must_use]
    pub fn bound_queue_capacity(&self) -> Option<usize> {
        self.registry.current_binding().map(|q| q.capacity())
    }

    /// Records dropped so far over all queues (non-blocking mode).
    #[must_use]
    pub fn lost_total(&self) -> u64 {
        self.registry.lost_total()
    }

    /// True when the reader last observed every queue empty.
    #[must_use]
    pub fn reader_idle(&self) -> bool {
        self.registry.is_empty_observed()
    }

    pub(crate) fn registry_arc(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Stop the logger: waits for the reader to drain every queue, then
    /// joins it. Records published while deinit is in progress are still
    /// emitted; writers arriving afterwards get [`Error::ShutDown`].
    pub fn deinit(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(reader) = self.reader.take() else {
            return Ok(());
        };
        // sync with the reader: it only parks with every queue drained
        while self.registry.wait().value() != 1 {
            if reader.is_finished() {
                break;
            }
            thread::sleep(DEINIT_SYNC_PAUSE);
        }
        self.registry.set_running(false);
        self.registry.wait().set(0);
        if let Err(e) = self.registry.wait().wake_one() {
            log::debug!("fuselog: reader already awake? ({e})");
        }
        reader.join().map_err(|_| Error::Internal(0))
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("queues", &self.queues_allocated())
            .field("running", &self.reader.is_some())
            .finish()
    }
}

/// Cheap clone-able handle onto a [`Logger`], for writer threads.
#[derive(Clone)]
pub struct LogHandle {
    registry: Arc<Registry>,
}

impl LogHandle {
    /// See [`Logger::log`].
    pub fn log(
        &self,
        level: Level,
        file: &'static str,
        func: &'static str,
        line: u32,
        args: fmt::Arguments<'_>,
    ) -> Result<()> {
        self.registry.log(level, file, func, line, args)
    }

    /// See [`Logger::assign_write_queue`].
    pub fn assign_write_queue(&self, lines_max: usize, opts: Opts) -> Result<()> {
        self.registry.assign_current(lines_max, opts).map(|_| ())
    }

    /// See [`Logger::free_write_queue`].
    pub fn free_write_queue(&self) -> Result<()> {
        self.registry.release_current()
    }

    /// See [`Logger::bound_queue_capacity`].
    #[must_use]
    pub fn bound_queue_capacity(&self) -> Option<usize> {
        self.registry.current_binding().map(|q| q.capacity())
    }

    pub(crate) fn registry_arc(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }
}

/// Install the process-global logger used by the level macros.
///
/// Fails with [`Error::InvalidArgument`] when one is already installed.
pub fn init(config: Config) -> Result<()> {
    let mut global = GLOBAL.lock();
    if global.is_some() {
        return Err(Error::InvalidArgument);
    }
    let logger = Logger::init(config)?;
    GLOBAL_REGISTRY.store(Some(logger.registry_arc()));
    *global = Some(logger);
    Ok(())
}

/// Tear down the process-global logger, draining every queue first.
pub fn deinit() -> Result<()> {
    let mut global = GLOBAL.lock();
    let Some(logger) = global.take() else {
        return Err(Error::ShutDown);
    };
    GLOBAL_REGISTRY.store(None);
    logger.deinit()
}

/// Entry point used by the level macros. Routes to the process-global
/// logger; plain [`Error::ShutDown`] when none is installed.
#[doc(hidden)]
pub fn log_args(
    level: Level,
    file: &'static str,
    func: &'static str,
    line: u32,
    args: fmt::Arguments<'_>,
) -> Result<()> {
    let registry = GLOBAL_REGISTRY.load();
    match registry.as_ref() {
        Some(registry) => registry.log(level, file, func, line, args),
        None => Err(Error::ShutDown),
    }
}
