//! Test doubles shared by unit tests.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::io::{self, ErrorKind};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::protocol::{Frame, Serializer, StompSerializer};
use crate::transport::Socket;

// ============================================================================
// ScriptedSocket
// ============================================================================

/// Observable state behind a [`ScriptedSocket`].
#[derive(Debug)]
pub(crate) struct Script {
    /// Result of every read readiness poll.
    pub readable: bool,
    /// Result of every write readiness poll.
    pub writable: bool,
    /// Outcomes of successive reads; empty means `WouldBlock`.
    pub reads: VecDeque<io::Result<Vec<u8>>>,
    /// Outcomes of successive writes; empty means "everything written".
    pub writes: VecDeque<io::Result<usize>>,
    /// Bytes offered to each write attempt.
    pub written: Vec<Vec<u8>>,
    /// Buffer length of each read attempt.
    pub read_requests: Vec<usize>,
    /// Reported by `is_closed`.
    pub closed: bool,
    /// Number of `close` calls.
    pub close_calls: usize,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            readable: true,
            writable: true,
            reads: VecDeque::new(),
            writes: VecDeque::new(),
            written: Vec::new(),
            read_requests: Vec::new(),
            closed: false,
            close_calls: 0,
        }
    }
}

/// Socket whose behavior is scripted through a shared [`Script`].
#[derive(Debug, Clone)]
pub(crate) struct ScriptedSocket {
    pub script: Arc<Mutex<Script>>,
}

impl ScriptedSocket {
    /// Returns the socket and a handle to its script.
    pub fn new() -> (Self, Arc<Mutex<Script>>) {
        let script = Arc::new(Mutex::new(Script::default()));
        (
            Self {
                script: Arc::clone(&script),
            },
            script,
        )
    }
}

impl Socket for ScriptedSocket {
    fn poll_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
        Ok(self.script.lock().readable)
    }

    fn poll_writable(&mut self, _timeout: Duration) -> io::Result<bool> {
        Ok(self.script.lock().writable)
    }

    fn read_nonblock(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut script = self.script.lock();
        script.read_requests.push(buf.len());

        match script.reads.pop_front() {
            Some(Ok(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(Err(e)) => Err(e),
            None => Err(io::Error::from(ErrorKind::WouldBlock)),
        }
    }

    fn write_nonblock(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut script = self.script.lock();
        script.written.push(buf.to_vec());

        match script.writes.pop_front() {
            Some(Ok(n)) => Ok(n.min(buf.len())),
            Some(Err(e)) => Err(e),
            None => Ok(buf.len()),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        let mut script = self.script.lock();
        script.close_calls += 1;
        script.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.script.lock().closed
    }
}

// ============================================================================
// RawSerializer
// ============================================================================

/// Encodes a frame as its body verbatim; decodes as STOMP.
///
/// Lets write tests control exact byte lengths.
#[derive(Debug, Default)]
pub(crate) struct RawSerializer {
    inner: StompSerializer,
}

impl Serializer for RawSerializer {
    fn encode(&mut self, frame: &Frame) -> Result<Vec<u8>> {
        Ok(frame.body.clone())
    }

    fn decode(&mut self, bytes: &[u8]) -> Result<Vec<Frame>> {
        self.inner.decode(bytes)
    }
}

// ============================================================================
// RecordingClient
// ============================================================================

/// Client that records dispatched frames.
#[derive(Debug)]
pub(crate) struct RecordingClient {
    pub versions: Vec<String>,
    pub connect_headers: Vec<(String, String)>,
    pub transmitted: Mutex<Vec<Frame>>,
    pub received: Mutex<Vec<Frame>>,
    /// When set, dispatch hooks fail with this message.
    pub fail_dispatch: Mutex<Option<String>>,
    /// When set, dispatch hooks fail with the error it builds.
    pub fail_with: Mutex<Option<fn() -> Error>>,
}

impl RecordingClient {
    pub fn new(versions: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            versions: versions.iter().map(|v| (*v).to_string()).collect(),
            connect_headers: Vec::new(),
            transmitted: Mutex::new(Vec::new()),
            received: Mutex::new(Vec::new()),
            fail_dispatch: Mutex::new(None),
            fail_with: Mutex::new(None),
        })
    }

    fn check(&self) -> Result<()> {
        if let Some(build) = *self.fail_with.lock() {
            return Err(build());
        }
        match self.fail_dispatch.lock().as_ref() {
            Some(message) => Err(Error::dispatch(message.clone())),
            None => Ok(()),
        }
    }
}

impl Client for RecordingClient {
    fn versions(&self) -> Vec<String> {
        self.versions.clone()
    }

    fn connect_headers(&self) -> Vec<(String, String)> {
        self.connect_headers.clone()
    }

    fn on_frame_transmitted(&self, frame: &Frame) -> Result<()> {
        self.check()?;
        self.transmitted.lock().push(frame.clone());
        Ok(())
    }

    fn on_frame_received(&self, frame: &Frame) -> Result<()> {
        self.check()?;
        self.received.lock().push(frame.clone());
        Ok(())
    }
}

/// Frame whose raw encoding is `bytes`.
pub(crate) fn raw_frame(bytes: &str) -> Frame {
    Frame::new("SEND").with_body(bytes)
}
