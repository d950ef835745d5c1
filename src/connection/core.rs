//! Connection state machine and reactor ticks.
//!
//! A [`Connection`] owns one socket and drives it without blocking. Every
//! tick performs at most one readiness poll and one read or write attempt.
//!
//! # States
//!
//! ```text
//! socket:  Open ──close(false)──► Closing ──next write tick──► Closed
//!            └─────────────close(true) / failure──────────────►┘
//!
//! link:    Unestablished ──handshake──► Established ──socket lost──► Died
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::{Command, DEFAULT_VERSION, Frame, Operation, Serializer};
use crate::transport::Socket;

use super::classify::{Direction, Disposition};
use super::config::ConnectionConfig;
use super::events::{ConnectionEvent, EventCallback, EventKind, EventRegistry};
use super::handshake::HandshakeState;
use super::write_queue::WriteQueue;

// ============================================================================
// State Enums
// ============================================================================

/// Socket lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket usable; writes are accepted.
    Open,
    /// Graceful close requested; the next write tick closes the socket.
    Closing,
    /// Socket released.
    Closed,
}

/// Protocol-level liveness, independent of the socket lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No completed handshake yet.
    Unestablished,
    /// Handshake completed and the socket is live.
    Established,
    /// The link was established and then lost. Terminal.
    Died,
}

// ============================================================================
// Connection
// ============================================================================

/// Non-blocking connection core.
///
/// Frames handed to [`write_frame_nonblock`](Self::write_frame_nonblock) are
/// serialized and queued; [`process`](Self::process) moves bytes in both
/// directions and reports complete frames to the [`Client`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use onstomp_core::{Client, Connection, Frame, StompSerializer};
/// use onstomp_core::transport::MemorySocket;
///
/// struct Versions;
/// impl Client for Versions {
///     fn versions(&self) -> Vec<String> {
///         vec!["1.0".into()]
///     }
/// }
///
/// let (socket, _broker) = MemorySocket::pair();
/// let mut connection = Connection::new(socket, Arc::new(Versions), Box::new(StompSerializer::new()));
///
/// connection.write_frame_nonblock(Frame::new("SEND").with_header("destination", "/q"))?;
/// connection.flush_write_buffer()?;
/// assert_eq!(connection.pending_writes(), 0);
/// # Ok::<(), onstomp_core::Error>(())
/// ```
pub struct Connection<S: Socket> {
    /// Identifier used in logs and event payloads.
    id: ConnectionId,
    /// Owned socket; `None` once released.
    socket: Option<S>,
    /// Owning client (shared, never mutated from here).
    pub(super) client: Arc<dyn Client>,
    /// Wire codec.
    pub(super) serializer: Box<dyn Serializer>,
    /// Tunables.
    pub(super) config: ConnectionConfig,
    /// Outbound entries.
    write_queue: WriteQueue,
    /// Socket lifecycle.
    state: ConnectionState,
    /// Protocol liveness.
    pub(super) link_state: LinkState,
    /// Handshake progress.
    pub(super) handshake: HandshakeState,
    /// Negotiated version; set once.
    pub(super) version: Option<String>,
    /// Lifecycle listeners.
    pub(super) events: EventRegistry,
    /// Scratch buffer for reads.
    read_buf: Vec<u8>,
}

// ============================================================================
// Constructors
// ============================================================================

impl<S: Socket> Connection<S> {
    /// Wraps an open socket with default configuration.
    pub fn new(socket: S, client: Arc<dyn Client>, serializer: Box<dyn Serializer>) -> Self {
        Self::build(socket, client, serializer, ConnectionConfig::default())
    }

    /// Wraps an open socket with `config`.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `config` fails validation.
    pub fn with_config(
        socket: S,
        client: Arc<dyn Client>,
        serializer: Box<dyn Serializer>,
        config: ConnectionConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(socket, client, serializer, config))
    }

    fn build(
        socket: S,
        client: Arc<dyn Client>,
        serializer: Box<dyn Serializer>,
        config: ConnectionConfig,
    ) -> Self {
        let id = ConnectionId::generate();
        debug!(connection = %id, "Connection created");

        Self {
            id,
            socket: Some(socket),
            client,
            serializer,
            read_buf: vec![0; config.max_bytes_per_read],
            config,
            write_queue: WriteQueue::new(),
            state: ConnectionState::Open,
            link_state: LinkState::Unestablished,
            handshake: HandshakeState::Idle,
            version: None,
            events: EventRegistry::new(),
        }
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl<S: Socket> Connection<S> {
    /// Returns the connection identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the socket lifecycle state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the protocol liveness state.
    #[inline]
    #[must_use]
    pub const fn link_state(&self) -> LinkState {
        self.link_state
    }

    /// Returns the negotiated version, once known.
    #[inline]
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Returns the configuration in effect.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns the number of queued frames.
    #[inline]
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.write_queue.len()
    }

    /// Returns the unsent bytes across all queued frames.
    #[inline]
    #[must_use]
    pub fn pending_bytes(&self) -> usize {
        self.write_queue.pending_bytes()
    }

    /// Returns `true` if the socket exists and is not closed.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.socket.as_ref().is_some_and(|socket| !socket.is_closed())
    }
}

// ============================================================================
// Event Subscription
// ============================================================================

impl<S: Socket> Connection<S> {
    /// Subscribes to [`EventKind::Terminated`].
    pub fn on_terminated(&mut self, callback: impl FnMut(&ConnectionEvent) + Send + 'static) {
        self.events.subscribe(EventKind::Terminated, Box::new(callback));
    }

    /// Subscribes to [`EventKind::Died`].
    pub fn on_died(&mut self, callback: impl FnMut(&ConnectionEvent) + Send + 'static) {
        self.events.subscribe(EventKind::Died, Box::new(callback));
    }

    /// Subscribes to [`EventKind::Established`].
    pub fn on_established(&mut self, callback: impl FnMut(&ConnectionEvent) + Send + 'static) {
        self.events.subscribe(EventKind::Established, Box::new(callback));
    }

    /// Subscribes a boxed callback to `kind`.
    pub fn subscribe(&mut self, kind: EventKind, callback: EventCallback) {
        self.events.subscribe(kind, callback);
    }

    pub(super) fn trigger(&mut self, kind: EventKind) {
        let event = ConnectionEvent {
            connection_id: self.id,
            kind,
            version: self.version.clone(),
        };
        self.events.trigger(&event);
    }
}

// ============================================================================
// Outbound Frames
// ============================================================================

impl<S: Socket> Connection<S> {
    /// Serializes `frame` and queues it for transmission. Never blocks.
    ///
    /// Frames written once a close has been requested are dropped.
    ///
    /// # Errors
    ///
    /// [`Error::Frame`] if the serializer rejects the frame.
    pub fn write_frame_nonblock(&mut self, frame: Frame) -> Result<()> {
        if self.state != ConnectionState::Open {
            debug!(connection = %self.id, command = %frame.command, "Dropping write on closing connection");
            return Ok(());
        }

        let bytes = self.serializer.encode(&frame)?;
        self.push_write_buffer(bytes, frame);
        Ok(())
    }

    /// Queues already serialized bytes for `frame`.
    pub(crate) fn push_write_buffer(&mut self, bytes: Vec<u8>, frame: Frame) {
        if self.state != ConnectionState::Open {
            debug!(connection = %self.id, command = %frame.command, "Dropping write on closing connection");
            return;
        }

        trace!(connection = %self.id, command = %frame.command, bytes = bytes.len(), "Frame queued");
        self.write_queue.push_back(bytes, frame);
    }

    /// Builds and queues a frame for `command`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedCommand`] if the negotiated version lacks the command
    /// - [`Error::Frame`] if a required header is missing
    pub fn send_command<I, K, V>(
        &mut self,
        command: Command,
        headers: I,
        body: impl Into<Vec<u8>>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let version = self.version.as_deref().unwrap_or(DEFAULT_VERSION);
        if !command.supported_in(version) {
            return Err(Error::unsupported_command(command.as_str()));
        }

        let mut frame = Frame::new(command.as_str()).with_body(body);
        for (name, value) in headers {
            frame.set_header(name, value);
        }

        if let Some(missing) = command
            .required_headers(version)
            .iter()
            .find(|name| !frame.has_header(name))
        {
            return Err(Error::frame(format!("{command} requires header {missing}")));
        }

        self.write_frame_nonblock(frame)
    }

    /// Resolves a command-shaped operation name and performs it.
    ///
    /// `send_frame`, `subscribe_frame`, ... queue the matching frame.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedCommand`] for an unknown `<command>_frame`
    /// - [`Error::NoSuchOperation`] for any other unknown name
    /// - errors of [`send_command`](Self::send_command)
    pub fn invoke<I, K, V>(&mut self, name: &str, headers: I, body: impl Into<Vec<u8>>) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        match Operation::resolve(name)? {
            Operation::Frame(command) => self.send_command(command, headers, body),
        }
    }
}

// ============================================================================
// Reactor
// ============================================================================

impl<S: Socket> Connection<S> {
    /// Runs one read tick, one write tick and the liveness check.
    ///
    /// # Errors
    ///
    /// Errors surfaced by either tick. The liveness check runs regardless.
    pub fn process(&mut self) -> Result<()> {
        self.process_with(|_| {})
    }

    /// Like [`process`](Self::process), calling `observer` for every frame
    /// received or fully transmitted during the call.
    ///
    /// # Errors
    ///
    /// Errors surfaced by either tick.
    pub fn process_with<F: FnMut(&Frame)>(&mut self, mut observer: F) -> Result<()> {
        let result = self
            .process_read_with(&mut observer)
            .and_then(|()| self.process_write_with(&mut observer));
        self.check_liveness();
        result
    }

    /// Runs one read tick.
    ///
    /// # Errors
    ///
    /// Fatal and unclassified failures, after the socket has been closed.
    pub fn process_read(&mut self) -> Result<()> {
        self.process_read_with(|_| {})
    }

    /// Runs one read tick, calling `observer` for each decoded frame after
    /// the client has seen it.
    ///
    /// # Errors
    ///
    /// Fatal and unclassified failures, after the socket has been closed.
    pub fn process_read_with<F: FnMut(&Frame)>(&mut self, mut observer: F) -> Result<()> {
        if !self.is_connected() {
            return Ok(());
        }

        let poll_timeout = self.config.poll_timeout();
        let max = self.config.max_bytes_per_read;
        let Some(socket) = self.socket.as_mut() else {
            return Ok(());
        };

        match socket.poll_readable(poll_timeout) {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(e) => return self.fail_tick(e.into(), Direction::Read),
        }

        let read = match socket.read_nonblock(&mut self.read_buf[..max]) {
            Ok(0) => return self.fail_tick(Error::ConnectionClosed, Direction::Read),
            Ok(n) => n,
            Err(e) => return self.fail_tick(e.into(), Direction::Read),
        };
        trace!(connection = %self.id, bytes = read, "Read tick");

        let frames = match self.serializer.decode(&self.read_buf[..read]) {
            Ok(frames) => frames,
            Err(e) => return self.fail_tick_as(e, Disposition::Unclassified, Direction::Read),
        };

        for frame in frames {
            trace!(connection = %self.id, command = %frame.command, "Frame received");
            if let Err(e) = self.client.on_frame_received(&frame) {
                return self.fail_tick_as(e, Disposition::Unclassified, Direction::Read);
            }
            observer(&frame);
        }

        Ok(())
    }

    /// Runs one write tick.
    ///
    /// # Errors
    ///
    /// Remote-close, fatal and unclassified failures, after the socket has
    /// been closed.
    pub fn process_write(&mut self) -> Result<()> {
        self.process_write_with(|_| {})
    }

    /// Runs one write tick, calling `observer` if a frame finishes
    /// transmitting.
    ///
    /// On a closing connection the tick closes the socket instead, dropping
    /// whatever is still queued.
    ///
    /// # Errors
    ///
    /// Remote-close, fatal and unclassified failures, after the socket has
    /// been closed.
    pub fn process_write_with<F: FnMut(&Frame)>(&mut self, mut observer: F) -> Result<()> {
        if self.state == ConnectionState::Closing {
            return self.finish_graceful_close();
        }
        if self.write_queue.is_empty() || !self.is_connected() {
            return Ok(());
        }

        let poll_timeout = self.config.poll_timeout();
        let Some(socket) = self.socket.as_mut() else {
            return Ok(());
        };

        match socket.poll_writable(poll_timeout) {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(e) => return self.fail_tick(e.into(), Direction::Write),
        }

        let Some((mut bytes, frame)) = self.write_queue.pop_front() else {
            return Ok(());
        };

        let written = match socket.write_nonblock(&bytes) {
            Ok(n) => n,
            Err(e) => {
                let error = Error::from(e);
                if Disposition::of(&error) == Disposition::Retryable {
                    self.write_queue.push_front(bytes, frame);
                }
                return self.fail_tick(error, Direction::Write);
            }
        };

        if written < bytes.len() {
            trace!(
                connection = %self.id,
                written,
                remaining = bytes.len() - written,
                "Partial write"
            );
            bytes.drain(..written);
            self.write_queue.push_front(bytes, frame);
            return Ok(());
        }

        trace!(connection = %self.id, command = %frame.command, bytes = written, "Frame transmitted");
        if let Err(e) = self.client.on_frame_transmitted(&frame) {
            return self.fail_tick_as(e, Disposition::Unclassified, Direction::Write);
        }
        observer(&frame);
        Ok(())
    }

    /// Writes until the queue is empty or the socket is gone.
    ///
    /// Spins on readiness polls; use sparingly.
    ///
    /// # Errors
    ///
    /// - errors surfaced by the write tick
    /// - [`Error::Timeout`] if `flush_timeout_ms` elapses first
    pub fn flush_write_buffer(&mut self) -> Result<()> {
        let started = Instant::now();
        let limit = self.config.flush_timeout();

        while !self.write_queue.is_empty() && self.is_connected() {
            self.process_write()?;

            if let Some(limit) = limit
                && started.elapsed() >= limit
                && !self.write_queue.is_empty()
            {
                return Err(Error::timeout(
                    "flush write buffer",
                    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                ));
            }
            std::hint::spin_loop();
        }

        Ok(())
    }

    /// Fires `Died` once if an established link lost its socket.
    fn check_liveness(&mut self) {
        if self.link_state == LinkState::Established && !self.is_connected() {
            self.link_state = LinkState::Died;
            info!(connection = %self.id, "Connection died");
            self.trigger(EventKind::Died);
        }
    }

    /// Applies the failure policy of a socket `error` for a tick in
    /// `direction`.
    fn fail_tick(&mut self, error: Error, direction: Direction) -> Result<()> {
        let disposition = Disposition::of(&error);
        self.fail_tick_as(error, disposition, direction)
    }

    /// Applies the policy of `disposition` to `error`.
    ///
    /// Codec and client hook failures are always unclassified, whatever
    /// error they carry.
    fn fail_tick_as(
        &mut self,
        error: Error,
        disposition: Disposition,
        direction: Direction,
    ) -> Result<()> {
        if !disposition.closes_socket() {
            trace!(connection = %self.id, ?direction, error = %error, "Retrying later");
            return Ok(());
        }

        if let Err(e) = self.release_socket() {
            warn!(connection = %self.id, error = %e, "Socket close failed");
        }

        if disposition.terminates() {
            self.trigger(EventKind::Terminated);
        }

        if disposition.is_reported(direction) {
            warn!(connection = %self.id, ?direction, ?disposition, error = %error, "Tick failed");
            Err(error)
        } else {
            debug!(connection = %self.id, ?direction, "Remote closed the connection");
            Ok(())
        }
    }
}

// ============================================================================
// Close
// ============================================================================

impl<S: Socket> Connection<S> {
    /// Closes the connection.
    ///
    /// With `immediate` the socket closes now. Otherwise the connection stops
    /// accepting writes and the next write tick closes the socket, dropping
    /// anything still queued. Closing a closed connection does nothing.
    ///
    /// # Errors
    ///
    /// The socket's close error. The socket is released either way.
    pub fn close(&mut self, immediate: bool) -> Result<()> {
        match (self.state, immediate) {
            (ConnectionState::Closed, _) => Ok(()),
            (_, true) => {
                debug!(connection = %self.id, "Closing immediately");
                self.release_socket().map_err(Error::from)
            }
            (ConnectionState::Open, false) => {
                debug!(connection = %self.id, pending = self.write_queue.len(), "Close requested");
                self.state = ConnectionState::Closing;
                Ok(())
            }
            (ConnectionState::Closing, false) => Ok(()),
        }
    }

    fn finish_graceful_close(&mut self) -> Result<()> {
        debug!(connection = %self.id, "Graceful close on write tick");
        self.release_socket().map_err(Error::from)
    }

    /// Closes and drops the socket exactly once. Queued writes are discarded.
    fn release_socket(&mut self) -> std::io::Result<()> {
        self.state = ConnectionState::Closed;

        let dropped = self.write_queue.clear();
        if dropped > 0 {
            debug!(connection = %self.id, dropped, "Discarded queued writes");
        }

        match self.socket.take() {
            Some(mut socket) if !socket.is_closed() => socket.close(),
            _ => Ok(()),
        }
    }
}

impl<S: Socket> Drop for Connection<S> {
    fn drop(&mut self) {
        if let Err(e) = self.release_socket() {
            warn!(connection = %self.id, error = %e, "Socket close failed on drop");
        }
    }
}

impl<S: Socket> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("link_state", &self.link_state)
            .field("handshake", &self.handshake)
            .field("version", &self.version)
            .field("pending_writes", &self.write_queue.len())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
