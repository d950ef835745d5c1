//! TCP socket in non-blocking mode.
//!
//! Readiness comes from a per-socket [`mio::Poll`]. mio reports edges, so
//! the socket remembers each direction as ready until an attempt in that
//! direction would block.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr};
use std::time::Duration;

use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token};
use tracing::debug;

use super::Socket;

// ============================================================================
// Constants
// ============================================================================

/// Token of the only registered source.
const STREAM: Token = Token(0);

// ============================================================================
// TcpSocket
// ============================================================================

/// A connected TCP stream driven without blocking.
///
/// # Example
///
/// ```no_run
/// use std::net::TcpStream;
/// use onstomp_core::transport::TcpSocket;
///
/// # fn example() -> std::io::Result<()> {
/// let stream = TcpStream::connect("127.0.0.1:61613")?;
/// let socket = TcpSocket::new(stream)?;
/// # Ok(())
/// # }
/// ```
pub struct TcpSocket {
    /// Underlying stream, registered with `poll`.
    stream: TcpStream,
    /// Readiness selector for `stream`.
    poll: Poll,
    /// Scratch event buffer.
    events: Events,
    /// Read readiness seen and not yet exhausted.
    readable: bool,
    /// Write readiness seen and not yet exhausted.
    writable: bool,
    /// Set once `close` has run.
    closed: bool,
}

impl TcpSocket {
    /// Wraps a connected stream, switches it to non-blocking mode and
    /// registers it for both directions.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from configuring or registering the stream.
    pub fn new(stream: std::net::TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;

        let mut stream = TcpStream::from_std(stream);
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut stream, STREAM, Interest::READABLE | Interest::WRITABLE)?;

        Ok(Self {
            stream,
            poll,
            events: Events::with_capacity(4),
            readable: false,
            writable: false,
            closed: false,
        })
    }

    /// Returns the remote address.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from the OS.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    /// Collects pending readiness edges, waiting up to `timeout` only if
    /// the wanted direction is not already known to be ready.
    fn refresh(&mut self, want_read: bool, timeout: Duration) -> io::Result<bool> {
        if self.closed {
            return Err(io::Error::from(ErrorKind::NotConnected));
        }

        let ready = |socket: &Self| if want_read { socket.readable } else { socket.writable };
        if ready(self) {
            return Ok(true);
        }

        self.poll.poll(&mut self.events, Some(timeout))?;
        for event in &self.events {
            // Hang-up and error states count as ready so the next attempt
            // surfaces them.
            if event.is_readable() || event.is_read_closed() || event.is_error() {
                self.readable = true;
            }
            if event.is_writable() || event.is_write_closed() || event.is_error() {
                self.writable = true;
            }
        }

        Ok(ready(self))
    }
}

impl Socket for TcpSocket {
    fn poll_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        self.refresh(true, timeout)
    }

    fn poll_writable(&mut self, timeout: Duration) -> io::Result<bool> {
        self.refresh(false, timeout)
    }

    fn read_nonblock(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let result = self.stream.read(buf);
        if matches!(&result, Err(e) if e.kind() == ErrorKind::WouldBlock) {
            self.readable = false;
        }
        result
    }

    fn write_nonblock(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = self.stream.write(buf);
        if matches!(&result, Err(e) if e.kind() == ErrorKind::WouldBlock) {
            self.writable = false;
        }
        result
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Err(e) = self.poll.registry().deregister(&mut self.stream) {
            debug!(error = %e, "Deregister failed at close");
        }

        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotConnected => {
                debug!("Peer already disconnected at close");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl fmt::Debug for TcpSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpSocket")
            .field("peer", &self.stream.peer_addr().ok())
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
