// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Line formatter and color themes.
//!
//! Turns one record into a fully-formed output line:
//!
//! ```text
//! -- 2026-08-01 --                           (banner, on day change only)
//! 14:23:07.123,456 [INFO ]   src/engine.rs engine::start   42 <worker-1> message
//! ```
//!
//! The day banner and the `HH:MM` prefix are cached (per day / per
//! minute) since they change rarely; the thread-name column widens to
//! the longest name seen so far so columns stay stable over a run.

use crate::level::Level;
use crate::record::RecordData;
use chrono::{DateTime, Local, TimeZone};
use std::fmt::Write;

const RESET: &str = "\x1b[0m";
const DARK_RED: &str = "\x1b[0;31m";
const DARK_GREEN: &str = "\x1b[0;32m";
const DARK_YELLOW: &str = "\x1b[0;33m";
const DARK_BLUE: &str = "\x1b[0;34m";
const DARK_MAGENTA: &str = "\x1b[0;35m";
const DARK_CYAN: &str = "\x1b[0;36m";
const DARK_WHITE: &str = "\x1b[0;37m";
const LIGHT_RED: &str = "\x1b[1;31m";
const LIGHT_GREEN: &str = "\x1b[1;32m";
const LIGHT_WHITE: &str = "\x1b[1;37m";

/// Width of the `file func line` source column.
const MAX_SOURCE_LEN: usize = 40;

/// ANSI color set applied by the formatter.
pub struct Theme {
    /// Per-level color, indexed by `Level::index()`.
    pub level: [&'static str; Level::COUNT],
    pub reset: &'static str,
    pub time: &'static str,
    pub date: &'static str,
    pub date_lines: &'static str,
    pub thread_name: &'static str,
}

/// Default colored theme.
pub static THEME_DEFAULT: Theme = Theme {
    level: [
        "\x1b[41m\x1b[1;37m", // Emerg: red background, light white
        "\x1b[4m\x1b[1;31m",  // Alert: underlined light red
        LIGHT_RED,            // Critical
        DARK_RED,             // Error
        DARK_YELLOW,          // Warning
        DARK_WHITE,           // Notice
        DARK_BLUE,            // Info
        DARK_MAGENTA,         // Debug
        DARK_GREEN,           // Okay
        DARK_CYAN,            // Trace
        LIGHT_WHITE,          // Oops
    ],
    reset: RESET,
    time: "",
    date: LIGHT_GREEN,
    date_lines: DARK_GREEN,
    thread_name: DARK_WHITE,
};

/// Black & white theme (no escape sequences at all).
pub static THEME_BW: Theme = Theme {
    level: [""; Level::COUNT],
    reset: "",
    time: "",
    date: "",
    date_lines: "",
    thread_name: "",
};

/// Reader-side line renderer. Reuses one output buffer per reader.
pub(crate) struct Formatter {
    theme: &'static Theme,
    line: String,
    src_col: String,
    prev_day: i64,
    banner: String,
    prev_min: i64,
    time_cache: String,
    widest_thread_name: usize,
}

impl Formatter {
    pub fn new(theme: &'static Theme) -> Self {
        Self {
            theme,
            line: String::with_capacity(crate::record::LINE_SZ + 128),
            src_col: String::with_capacity(64),
            prev_day: i64::MIN,
            banner: String::new(),
            prev_min: i64::MIN,
            time_cache: String::new(),
            widest_thread_name: 0,
        }
    }

    /// Render one record into the internal buffer and return it.
    pub fn format_line(&mut self, thread_name: &str, data: &RecordData) -> &[u8] {
        let c = self.theme;
        let secs = (data.wall_ns / 1_000_000_000) as i64;
        let sub_ns = data.wall_ns % 1_000_000_000;
        let msec = sub_ns / 1_000_000;
        let usec = (sub_ns / 1_000) % 1_000;

        let local = local_time(secs);
        self.refresh_date_caches(secs, local.as_ref());

        self.src_col.clear();
        let _ = write!(
            self.src_col,
            "{:>24} {:>20} {:>4}",
            data.file, data.func, data.line
        );
        let src = tail_chars(&self.src_col, MAX_SOURCE_LEN);

        if thread_name.len() > self.widest_thread_name {
            self.widest_thread_name = thread_name.len();
        }

        self.line.clear();
        let _ = write!(
            self.line,
            "{}{}:{:02}.{:03},{:03} [{}{}{}] {:>src_w$} <{}{:>name_w$}{}> {}\n",
            self.banner,
            self.time_cache,
            secs % 60,
            msec,
            usec,
            c.level[data.level.index()],
            data.level.label(),
            c.reset,
            src,
            c.thread_name,
            thread_name,
            c.reset,
            String::from_utf8_lossy(data.msg_bytes()),
            src_w = MAX_SOURCE_LEN,
            name_w = self.widest_thread_name,
        );
        // the banner is printed at most once
        self.banner.clear();
        self.line.as_bytes()
    }

    fn refresh_date_caches(&mut self, secs: i64, local: Option<&DateTime<Local>>) {
        let c = self.theme;
        let day = secs / (60 * 60 * 24);
        if day != self.prev_day {
            self.banner.clear();
            if let Some(local) = local {
                let _ = write!(
                    self.banner,
                    "{}-- {}{}{}-- {}\n",
                    c.date_lines,
                    c.date,
                    local.format("%Y-%m-%d "),
                    c.date_lines,
                    c.reset
                );
            }
            self.prev_day = day;
        }
        let min = secs / 60;
        if min != self.prev_min {
            self.time_cache.clear();
            if let Some(local) = local {
                let _ = write!(
                    self.time_cache,
                    "{}{}{}",
                    c.time,
                    local.format("%H:%M"),
                    c.reset
                );
            }
            self.prev_min = min;
        }
    }
}

fn local_time(secs: i64) -> Option<DateTime<Local>> {
    Local.timestamp_opt(secs, 0).single()
}

/// Last `max` characters of `s` (the tail carries the function and line,
/// the part worth keeping when the column overflows).
fn tail_chars(s: &str, max: usize) -> &str {
    let count = s.chars().count();
    if count <= max {
        return s;
    }
    let skip = count - max;
    match s.char_indices().nth(skip) {
        Some((pos, _)) => &s[pos..],
        None => s,
    }
}
