// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by every fuselog operation.

use std::fmt;

/// Errors surfaced by the logging API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A parameter was out of range (e.g. `queues_max = 0`), or the call
    /// does not apply to the current thread state.
    InvalidArgument,

    /// No free queue fits the request and the registry is at `queues_max`.
    CapacityExhausted,

    /// The logger is not running (never initialized, or deinit requested).
    ShutDown,

    /// Non-blocking publish found the queue full; the record was dropped.
    WouldBlock,

    /// The wait primitive failed with an unexpected OS error (errno).
    Internal(i32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::CapacityExhausted => write!(f, "no free write queue slot left"),
            Self::ShutDown => write!(f, "logger is shut down"),
            Self::WouldBlock => write!(f, "write queue full, record dropped"),
            Self::Internal(errno) => write!(f, "wait primitive failure (errno {errno})"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(e.raw_os_error().unwrap_or(0))
    }
}

/// Result type for fuselog operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::ShutDown.to_string(), "logger is shut down");
        assert_eq!(
            Error::Internal(22).to_string(),
            "wait primitive failure (errno 22)"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::from_raw_os_error(libc::EBADF);
        assert_eq!(Error::from(io), Error::Internal(libc::EBADF));
    }
}
