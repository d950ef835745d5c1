//! Duplex byte-stream seam.
//!
//! The connection core never blocks on I/O: every read or write attempt is
//! preceded by a readiness poll, and the attempt itself must return
//! immediately with either progress or [`ErrorKind::WouldBlock`].
//!
//! [`ErrorKind::WouldBlock`]: std::io::ErrorKind::WouldBlock

// ============================================================================
// Imports
// ============================================================================

use std::io;
use std::time::Duration;

// ============================================================================
// Socket Trait
// ============================================================================

/// An already-open, non-blocking duplex byte stream.
///
/// Implementations report failures as [`io::Error`]; the reactor classifies
/// them by [`io::ErrorKind`].
pub trait Socket: Send {
    /// Returns `true` if a read would make progress within `timeout`.
    ///
    /// A zero timeout checks without waiting.
    fn poll_readable(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Returns `true` if a write would make progress within `timeout`.
    fn poll_writable(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Reads up to `buf.len()` bytes without blocking.
    ///
    /// `Ok(0)` means end of stream.
    fn read_nonblock(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes a prefix of `buf` without blocking and returns its length.
    fn write_nonblock(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Closes the stream. Closing twice is not an error.
    fn close(&mut self) -> io::Result<()>;

    /// Returns `true` once the stream has been closed locally.
    fn is_closed(&self) -> bool;
}

impl<S: Socket + ?Sized> Socket for Box<S> {
    fn poll_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        (**self).poll_readable(timeout)
    }

    fn poll_writable(&mut self, timeout: Duration) -> io::Result<bool> {
        (**self).poll_writable(timeout)
    }

    fn read_nonblock(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_nonblock(buf)
    }

    fn write_nonblock(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write_nonblock(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}
