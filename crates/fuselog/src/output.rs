// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Output sinks.
//!
//! The reader delivers each fully-formed line with a single
//! `write_line` call; sinks are used from that one thread only, hence
//! `&mut self` and no internal locking.

use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

/// Destination for formatted log lines.
pub trait Output: Send {
    /// Write one fully-formed line (terminator included) in a single
    /// operation.
    fn write_line(&mut self, line: &[u8]) -> io::Result<()>;

    /// Flush any buffered output.
    fn flush(&mut self) -> io::Result<()>;
}

/// Standard output sink (the default).
pub struct StdoutOutput;

impl Output for StdoutOutput {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        io::stdout().lock().write_all(line)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// File sink. Creates/truncates the file at the given path.
pub struct FileOutput {
    file: std::fs::File,
}

impl FileOutput {
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self { file })
    }
}

impl Output for FileOutput {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.file.write_all(line)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// In-memory sink for tests: captures every line, shared handle
/// readable from the test thread.
#[derive(Clone, Default)]
pub struct MemoryOutput {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryOutput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle onto the captured lines (newline stripped).
    #[must_use]
    pub fn lines(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.lines)
    }

    /// Snapshot of the captured lines.
    #[must_use]
    pub fn collected(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl Output for MemoryOutput {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        let text = String::from_utf8_lossy(line);
        self.lines
            .lock()
            .push(text.trim_end_matches('\n').to_string());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Discards everything; for benchmarks.
pub struct NullOutput;

impl Output for NullOutput {
    fn write_line(&mut self, _line: &[u8]) -> io::Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
