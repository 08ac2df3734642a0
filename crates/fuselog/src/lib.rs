// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # fuselog - low-latency per-thread queued logging
//!
//! Writer threads spend as little time as possible in the logging call:
//! the hot path is one per-thread, lock-free ring enqueue. All
//! formatting and output happen on a dedicated reader thread that
//! performs a k-way merge over every writer ring in timestamp order and
//! emits a globally time-ordered stream to the sink.
//!
//! ```text
//! writer A --> WriteQueue A (SPSC ring) --+
//! writer B --> WriteQueue B (SPSC ring) --+--> reader: fuse merge --> Formatter --> sink
//! writer C --> WriteQueue C (SPSC ring) --+         (min timestamp)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fuselog::{Config, Level};
//!
//! fn main() -> fuselog::Result<()> {
//!     fuselog::init(Config {
//!         level_min: Level::Debug,
//!         ..Config::default()
//!     })?;
//!
//!     fuselog::info!("service started on port {}", 8080);
//!     fuselog::debug!("details: {:?}", vec![1, 2, 3]);
//!
//!     fuselog::deinit()
//! }
//! ```
//!
//! ## Key Properties
//!
//! - Publishing never allocates: messages are formatted straight into a
//!   fixed slot buffer ([`LINE_SZ`] bytes).
//! - Per queue, emission preserves publication order; across queues,
//!   records are merged on a monotonic stamp taken at publication.
//! - The reader sleeps on a futex-like wait cell when idle; writers
//!   wake it with a single CAS + wake, so no record waits behind a
//!   sleeping reader.
//! - A full queue blocks the writer by default; with [`Opts::NONBLOCK`]
//!   it drops instead, and [`Opts::PRINTLOST`] reports the drop count
//!   once space frees up.
//!
//! ## Build Selector
//!
//! - default (`threaded`): the pipeline described above;
//! - `--no-default-features`: synchronous fallback, same macros but
//!   formatting happens inline in the calling thread;
//! - feature `disabled`: every macro expands to nothing and its
//!   arguments are **not** evaluated - do not rely on side effects in
//!   argument position.

mod config;
mod error;
mod format;
mod level;
mod opts;
mod output;
mod record;

#[cfg(feature = "threaded")]
mod fuse;
#[cfg(feature = "threaded")]
mod logger;
#[cfg(feature = "threaded")]
mod queue;
#[cfg(feature = "threaded")]
mod reader;
#[cfg(feature = "threaded")]
mod registry;
#[cfg(feature = "threaded")]
mod thread;
#[cfg(feature = "threaded")]
mod wait;

#[cfg(not(feature = "threaded"))]
mod direct;

pub use config::Config;
pub use error::{Error, Result};
pub use format::{Theme, THEME_BW, THEME_DEFAULT};
pub use level::Level;
pub use opts::Opts;
pub use output::{FileOutput, MemoryOutput, NullOutput, Output, StdoutOutput};
pub use record::LINE_SZ;

#[cfg(feature = "threaded")]
pub use logger::{deinit, init, log_args, LogHandle, Logger};
#[cfg(feature = "threaded")]
pub use thread::spawn_writer;

#[cfg(not(feature = "threaded"))]
pub use direct::{deinit, init, log_args};

/// Path of the enclosing function, as a `&'static str`.
///
/// Implementation detail of the level macros.
#[doc(hidden)]
#[macro_export]
macro_rules! function_path {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        // strip the trailing "::f"
        &name[..name.len() - 3]
    }};
}

/// Log at an explicit [`Level`](crate::Level).
///
/// Formatted like `println!()`; the record's source location is filled
/// in automatically. Errors (queue full in non-blocking mode, logger
/// shut down) are swallowed; use the counters on
/// [`Logger`](crate::Logger) to observe drops.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! log_level {
    ($lvl:expr, $($arg:tt)*) => {
        let _ = $crate::log_args(
            $lvl,
            file!(),
            $crate::function_path!(),
            line!(),
            format_args!($($arg)*),
        );
    };
}

/// No-op variant (feature `disabled`): arguments are not evaluated.
#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! log_level {
    ($lvl:expr, $($arg:tt)*) => {};
}

/// System is unusable; a complete restart/check must be done.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! emerg {
    ($($arg:tt)*) => {
        let _ = $crate::log_args($crate::Level::Emerg, file!(),
            $crate::function_path!(), line!(), format_args!($($arg)*));
    };
}

/// The process cannot continue working, manual action required.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! alert {
    ($($arg:tt)*) => {
        let _ = $crate::log_args($crate::Level::Alert, file!(),
            $crate::function_path!(), line!(), format_args!($($arg)*));
    };
}

/// The process entered an unknown state.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! critical {
    ($($arg:tt)*) => {
        let _ = $crate::log_args($crate::Level::Critical, file!(),
            $crate::function_path!(), line!(), format_args!($($arg)*));
    };
}

/// Error-level message.
///
/// Formatted the same as the `println!()` macro.
///
/// # Example
/// ```ignore
/// fuselog::error!("connection lost: {}", cause);
/// ```
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        let _ = $crate::log_args($crate::Level::Error, file!(),
            $crate::function_path!(), line!(), format_args!($($arg)*));
    };
}

/// Message has to be checked further.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! warning {
    ($($arg:tt)*) => {
        let _ = $crate::log_args($crate::Level::Warning, file!(),
            $crate::function_path!(), line!(), format_args!($($arg)*));
    };
}

/// Message could be important or interesting to know.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! notice {
    ($($arg:tt)*) => {
        let _ = $crate::log_args($crate::Level::Notice, file!(),
            $crate::function_path!(), line!(), format_args!($($arg)*));
    };
}

/// Info-level message.
///
/// # Example
/// ```ignore
/// fuselog::info!("service started on port {}", port);
/// ```
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        let _ = $crate::log_args($crate::Level::Info, file!(),
            $crate::function_path!(), line!(), format_args!($($arg)*));
    };
}

/// Debugging information only.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        let _ = $crate::log_args($crate::Level::Debug, file!(),
            $crate::function_path!(), line!(), format_args!($($arg)*));
    };
}

/// Commit point, what was expected happened.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! okay {
    ($($arg:tt)*) => {
        let _ = $crate::log_args($crate::Level::Okay, file!(),
            $crate::function_path!(), line!(), format_args!($($arg)*));
    };
}

/// Trace lines, cheap to filter out in huge volumes.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        let _ = $crate::log_args($crate::Level::Trace, file!(),
            $crate::function_path!(), line!(), format_args!($($arg)*));
    };
}

/// Something not foreseen happened (code mistakes, config, ...).
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! oops {
    ($($arg:tt)*) => {
        let _ = $crate::log_args($crate::Level::Oops, file!(),
            $crate::function_path!(), line!(), format_args!($($arg)*));
    };
}

/// No-op variant (feature `disabled`).
#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! emerg {
    ($($arg:tt)*) => {};
}

/// No-op variant (feature `disabled`).
#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! alert {
    ($($arg:tt)*) => {};
}

/// No-op variant (feature `disabled`).
#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! critical {
    ($($arg:tt)*) => {};
}

/// No-op variant (feature `disabled`).
#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {};
}

/// No-op variant (feature `disabled`).
#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! warning {
    ($($arg:tt)*) => {};
}

/// No-op variant (feature `disabled`).
#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! notice {
    ($($arg:tt)*) => {};
}

/// No-op variant (feature `disabled`).
#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {};
}

/// No-op variant (feature `disabled`).
#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

/// No-op variant (feature `disabled`).
#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! okay {
    ($($arg:tt)*) => {};
}

/// No-op variant (feature `disabled`).
#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// No-op variant (feature `disabled`).
#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! oops {
    ($($arg:tt)*) => {};
}


#[cfg(all(test, feature = "disabled"))]
mod tests_disabled {
    #[test]
    fn test_macros_do_not_evaluate_arguments() {
        let hits = std::cell::Cell::new(0u32);
        let bump = || {
            hits.set(hits.get() + 1);
            hits.get()
        };
        info!("{}", bump());
        error!("{}", bump());
        log_level!(crate::Level::Info, "{}", bump());
        assert_eq!(hits.get(), 0);
        let _ = &bump;
    }
}
