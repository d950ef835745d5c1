//! Failure classification for reactor ticks.
//!
//! | Disposition | Sources | Socket | Read path | Write path |
//! |-------------|---------|--------|-----------|------------|
//! | `Retryable` | `Interrupted`, `WouldBlock` | stays open | swallowed | entry restored, swallowed |
//! | `RemoteClosed` | EOF, reset, broken pipe | closed | swallowed | surfaced |
//! | `Fatal` | any other I/O error | closed | surfaced | surfaced |
//! | `Unclassified` | non-I/O failure inside a tick | closed, `Terminated` fires | surfaced | surfaced |

// ============================================================================
// Imports
// ============================================================================

use crate::error::Error;

// ============================================================================
// Disposition
// ============================================================================

/// What a reactor tick must do with a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Transient; restore state and yield for this tick.
    Retryable,
    /// The peer went away.
    RemoteClosed,
    /// I/O-layer failure.
    Fatal,
    /// Anything that is not an I/O condition.
    Unclassified,
}

/// Direction of the failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Non-blocking read.
    Read,
    /// Non-blocking write.
    Write,
}

impl Disposition {
    /// Classifies a socket failure raised during a tick.
    #[must_use]
    pub fn of(error: &Error) -> Self {
        if error.is_retryable() {
            Self::Retryable
        } else if error.is_remote_closed() {
            Self::RemoteClosed
        } else if matches!(error, Error::Io(_)) {
            Self::Fatal
        } else {
            Self::Unclassified
        }
    }

    /// Returns `true` if the socket must be closed.
    #[inline]
    #[must_use]
    pub const fn closes_socket(self) -> bool {
        !matches!(self, Self::Retryable)
    }

    /// Returns `true` if the failure reaches the caller of the tick.
    #[inline]
    #[must_use]
    pub const fn is_reported(self, direction: Direction) -> bool {
        match self {
            Self::Retryable => false,
            Self::RemoteClosed => matches!(direction, Direction::Write),
            Self::Fatal | Self::Unclassified => true,
        }
    }

    /// Returns `true` if the `Terminated` event fires.
    #[inline]
    #[must_use]
    pub const fn terminates(self) -> bool {
        matches!(self, Self::Unclassified)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{self, ErrorKind};

    fn io(kind: ErrorKind) -> Error {
        io::Error::from(kind).into()
    }

    #[test]
    fn test_transient_kinds_are_retryable() {
        assert_eq!(Disposition::of(&io(ErrorKind::Interrupted)), Disposition::Retryable);
        assert_eq!(Disposition::of(&io(ErrorKind::WouldBlock)), Disposition::Retryable);
    }

    #[test]
    fn test_peer_loss_is_remote_closed() {
        for kind in [
            ErrorKind::UnexpectedEof,
            ErrorKind::ConnectionReset,
            ErrorKind::ConnectionAborted,
            ErrorKind::BrokenPipe,
            ErrorKind::NotConnected,
        ] {
            assert_eq!(Disposition::of(&io(kind)), Disposition::RemoteClosed, "{kind:?}");
        }
        assert_eq!(
            Disposition::of(&Error::ConnectionClosed),
            Disposition::RemoteClosed
        );
    }

    #[test]
    fn test_other_io_is_fatal() {
        assert_eq!(Disposition::of(&io(ErrorKind::PermissionDenied)), Disposition::Fatal);
        let os: Error = io::Error::from_raw_os_error(13).into();
        assert_eq!(Disposition::of(&os), Disposition::Fatal);
    }

    #[test]
    fn test_non_io_is_unclassified() {
        assert_eq!(Disposition::of(&Error::frame("bad")), Disposition::Unclassified);
        assert_eq!(Disposition::of(&Error::dispatch("hook")), Disposition::Unclassified);
    }

    #[test]
    fn test_reporting_rules() {
        assert!(!Disposition::Retryable.is_reported(Direction::Read));
        assert!(!Disposition::Retryable.is_reported(Direction::Write));
        assert!(!Disposition::RemoteClosed.is_reported(Direction::Read));
        assert!(Disposition::RemoteClosed.is_reported(Direction::Write));
        assert!(Disposition::Fatal.is_reported(Direction::Read));
        assert!(Disposition::Unclassified.is_reported(Direction::Write));
    }

    #[test]
    fn test_close_and_terminate_rules() {
        assert!(!Disposition::Retryable.closes_socket());
        assert!(Disposition::RemoteClosed.closes_socket());
        assert!(Disposition::Fatal.closes_socket());
        assert!(Disposition::Unclassified.terminates());
        assert!(!Disposition::Fatal.terminates());
    }
}
