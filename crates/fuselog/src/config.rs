// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logger configuration.

use crate::format::{Theme, THEME_DEFAULT};
use crate::level::Level;
use crate::opts::Opts;
use crate::output::{Output, StdoutOutput};
use std::fmt;

/// Parameters for [`Logger::init`](crate::Logger::init).
///
/// ```no_run
/// use fuselog::{Config, Level, Opts};
///
/// let config = Config {
///     queues_max: 16,
///     level_min: Level::Debug,
///     opts: Opts::PRINTLOST,
///     ..Config::default()
/// };
/// ```
pub struct Config {
    /// Maximum number of write queues ever allocated (>= 1).
    pub queues_max: usize,
    /// Default ring size for queues requested with `lines_max = 0`.
    pub default_lines_nr: usize,
    /// Records with a level above this one are dropped at entry.
    pub level_min: Level,
    /// Default options inherited by queues bound with `Opts::NONE`.
    pub opts: Opts,
    /// Color theme applied by the formatter.
    pub theme: &'static Theme,
    /// Destination sink, owned by the reader thread.
    pub output: Box<dyn Output>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queues_max: 8,
            default_lines_nr: 64,
            level_min: Level::Oops,
            opts: Opts::NONE,
            theme: &THEME_DEFAULT,
            output: Box::new(StdoutOutput),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("queues_max", &self.queues_max)
            .field("default_lines_nr", &self.default_lines_nr)
            .field("level_min", &self.level_min)
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.queues_max, 8);
        assert_eq!(config.default_lines_nr, 64);
        assert_eq!(config.level_min, Level::Oops);
        assert_eq!(config.opts, Opts::NONE);
    }
}
