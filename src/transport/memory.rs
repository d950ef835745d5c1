//! In-process socket pair.
//!
//! Two [`MemorySocket`]s share one pipe per direction. Useful for driving a
//! connection against an in-process broker in tests, demos and benches.
//! Readiness is evaluated immediately; poll timeouts are not waited out.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::io::{self, ErrorKind};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::Socket;

// ============================================================================
// Pipe
// ============================================================================

/// One direction of a pair.
#[derive(Debug, Default)]
struct Pipe {
    /// Bytes written and not yet read.
    buffer: VecDeque<u8>,
    /// Maximum buffered bytes; `None` for unbounded.
    capacity: Option<usize>,
    /// Set when either end closes.
    closed: bool,
}

impl Pipe {
    fn with_capacity(capacity: Option<usize>) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            capacity,
            ..Self::default()
        }))
    }

    fn space(&self) -> usize {
        self.capacity
            .map_or(usize::MAX, |cap| cap.saturating_sub(self.buffer.len()))
    }
}

// ============================================================================
// MemorySocket
// ============================================================================

/// One end of an in-process duplex pipe.
///
/// # Example
///
/// ```
/// use onstomp_core::transport::{MemorySocket, Socket};
///
/// let (mut a, mut b) = MemorySocket::pair();
/// a.write_nonblock(b"hi").unwrap();
///
/// let mut buf = [0u8; 8];
/// let n = b.read_nonblock(&mut buf).unwrap();
/// assert_eq!(&buf[..n], b"hi");
/// ```
#[derive(Debug)]
pub struct MemorySocket {
    /// Pipe this end reads from.
    inbound: Arc<Mutex<Pipe>>,
    /// Pipe this end writes to.
    outbound: Arc<Mutex<Pipe>>,
    /// Set once `close` has run on this end.
    closed: bool,
}

impl MemorySocket {
    /// Creates a connected pair with unbounded pipes.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        Self::build_pair(None)
    }

    /// Creates a connected pair whose pipes hold at most `capacity` bytes.
    ///
    /// Writes beyond the free space are short, which exercises partial
    /// write recovery.
    #[must_use]
    pub fn pair_with_capacity(capacity: usize) -> (Self, Self) {
        Self::build_pair(Some(capacity))
    }

    fn build_pair(capacity: Option<usize>) -> (Self, Self) {
        let a_to_b = Pipe::with_capacity(capacity);
        let b_to_a = Pipe::with_capacity(capacity);

        let a = Self {
            inbound: Arc::clone(&b_to_a),
            outbound: Arc::clone(&a_to_b),
            closed: false,
        };
        let b = Self {
            inbound: a_to_b,
            outbound: b_to_a,
            closed: false,
        };
        (a, b)
    }

    /// Returns the number of bytes waiting to be read on this end.
    #[must_use]
    pub fn available(&self) -> usize {
        self.inbound.lock().buffer.len()
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed {
            Err(io::Error::from(ErrorKind::NotConnected))
        } else {
            Ok(())
        }
    }
}

impl Socket for MemorySocket {
    fn poll_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
        self.ensure_open()?;
        let pipe = self.inbound.lock();
        Ok(!pipe.buffer.is_empty() || pipe.closed)
    }

    fn poll_writable(&mut self, _timeout: Duration) -> io::Result<bool> {
        self.ensure_open()?;
        let pipe = self.outbound.lock();
        Ok(pipe.closed || pipe.space() > 0)
    }

    fn read_nonblock(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.ensure_open()?;
        let mut pipe = self.inbound.lock();

        if pipe.buffer.is_empty() {
            return if pipe.closed {
                Ok(0)
            } else {
                Err(io::Error::from(ErrorKind::WouldBlock))
            };
        }

        let n = buf.len().min(pipe.buffer.len());
        for (slot, byte) in buf.iter_mut().zip(pipe.buffer.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_nonblock(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ensure_open()?;
        let mut pipe = self.outbound.lock();

        if pipe.closed {
            return Err(io::Error::from(ErrorKind::BrokenPipe));
        }

        let n = buf.len().min(pipe.space());
        if n == 0 && !buf.is_empty() {
            return Err(io::Error::from(ErrorKind::WouldBlock));
        }
        pipe.buffer.extend(&buf[..n]);
        Ok(n)
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inbound.lock().closed = true;
        self.outbound.lock().closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for MemorySocket {
    fn drop(&mut self) {
        // Peer sees end of stream.
        let _ = Socket::close(self);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pipe_would_block() {
        let (mut a, _b) = MemorySocket::pair();
        assert!(!a.poll_readable(Duration::ZERO).unwrap());

        let mut buf = [0u8; 4];
        let err = a.read_nonblock(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);
    }

    #[test]
    fn test_bounded_pipe_short_writes() {
        let (mut a, mut b) = MemorySocket::pair_with_capacity(4);

        assert_eq!(a.write_nonblock(b"abcdef").unwrap(), 4);
        assert!(!a.poll_writable(Duration::ZERO).unwrap());
        assert_eq!(
            a.write_nonblock(b"ef").unwrap_err().kind(),
            ErrorKind::WouldBlock
        );

        let mut buf = [0u8; 2];
        assert_eq!(b.read_nonblock(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"ab");
        assert_eq!(a.write_nonblock(b"ef").unwrap(), 2);
        assert_eq!(b.available(), 4);
    }

    #[test]
    fn test_peer_close_drains_then_eof() {
        let (mut a, mut b) = MemorySocket::pair();
        a.write_nonblock(b"bye").unwrap();
        a.close().unwrap();

        assert!(b.poll_readable(Duration::ZERO).unwrap());
        let mut buf = [0u8; 8];
        assert_eq!(b.read_nonblock(&mut buf).unwrap(), 3);
        assert_eq!(b.read_nonblock(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_write_after_peer_close_is_broken_pipe() {
        let (mut a, mut b) = MemorySocket::pair();
        b.close().unwrap();

        assert!(a.poll_writable(Duration::ZERO).unwrap());
        let err = a.write_nonblock(b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_dropped_end_reads_as_eof() {
        let (a, mut b) = MemorySocket::pair();
        drop(a);

        let mut buf = [0u8; 4];
        assert_eq!(b.read_nonblock(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_closed_end_rejects_io() {
        let (mut a, _b) = MemorySocket::pair();
        a.close().unwrap();
        a.close().unwrap();

        assert!(a.is_closed());
        assert_eq!(
            a.poll_readable(Duration::ZERO).unwrap_err().kind(),
            ErrorKind::NotConnected
        );
    }
}
