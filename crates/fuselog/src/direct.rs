// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Synchronous fallback, selected by building without the `threaded`
//! feature.
//!
//! The macro surface is unchanged, but every call formats inline under a
//! mutex and writes straight to the sink. No queues, no reader thread;
//! useful where a background thread is unwanted (constrained targets,
//! unit tests of the calling code).

use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::Formatter;
use crate::level::Level;
use crate::output::Output;
use crate::record::{current_thread_name, mono_now_ns, wall_now_ns, RecordData, TruncWriter};
use parking_lot::Mutex;
use std::fmt;

struct DirectLogger {
    level_min: Level,
    formatter: Formatter,
    output: Box<dyn Output>,
}

static GLOBAL: Mutex<Option<DirectLogger>> = Mutex::new(None);

/// Install the process-global synchronous logger.
pub fn init(config: Config) -> Result<()> {
    if config.queues_max == 0 || config.default_lines_nr == 0 {
        return Err(Error::InvalidArgument);
    }
    let mut global = GLOBAL.lock();
    if global.is_some() {
        return Err(Error::InvalidArgument);
    }
    *global = Some(DirectLogger {
        level_min: config.level_min,
        formatter: Formatter::new(config.theme),
        output: config.output,
    });
    Ok(())
}

/// Tear down the synchronous logger, flushing the sink.
pub fn deinit() -> Result<()> {
    let mut global = GLOBAL.lock();
    let Some(mut logger) = global.take() else {
        return Err(Error::ShutDown);
    };
    if let Err(e) = logger.output.flush() {
        log::warn!("fuselog: sink flush failed: {e}");
    }
    Ok(())
}

/// Entry point used by the level macros in synchronous mode.
#[doc(hidden)]
pub fn log_args(
    level: Level,
    file: &'static str,
    func: &'static str,
    line: u32,
    args: fmt::Arguments<'_>,
) -> Result<()> {
    let mut global = GLOBAL.lock();
    let Some(logger) = global.as_mut() else {
        return Err(Error::ShutDown);
    };
    if level > logger.level_min {
        return Ok(());
    }

    let mut data = RecordData::empty();
    data.mono_ns = mono_now_ns();
    data.wall_ns = wall_now_ns();
    data.level = level;
    data.file = file;
    data.func = func;
    data.line = line;
    let mut w = TruncWriter::new(&mut data.msg);
    let _ = fmt::Write::write_fmt(&mut w, args);
    data.msg_len = w.written() as u16;

    let name = current_thread_name();
    let rendered = logger.formatter.format_line(&name, &data);
    if let Err(e) = logger.output.write_line(rendered) {
        // same policy as the reader: drop the line, keep going
        log::warn!("fuselog: sink write failed, line dropped: {e}");
    }
    Ok(())
}
