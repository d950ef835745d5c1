//! CONNECT / CONNECTED exchange.
//!
//! ```text
//! Idle ──connect()──► AwaitingConnected ──CONNECTED, known version──► Established
//!                              └──refused / bad version / closed / timeout──► Failed
//! ```
//!
//! Handshake failures leave the socket as it is; tearing down is the
//! caller's decision.

// ============================================================================
// Imports
// ============================================================================

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::protocol::{Frame, negotiate, version_of};
use crate::transport::Socket;

use super::core::{Connection, LinkState};
use super::events::{EventCallback, EventKind};

// ============================================================================
// Constants
// ============================================================================

/// Command the broker must answer CONNECT with.
const CONNECTED: &str = "CONNECTED";

/// Header carrying the offered versions.
const ACCEPT_VERSION_HEADER: &str = "accept-version";

// ============================================================================
// HandshakeState
// ============================================================================

/// Progress of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Not started.
    Idle,
    /// CONNECT queued or sent, waiting for the first inbound frame.
    AwaitingConnected,
    /// CONNECTED received with an acceptable version.
    Established,
    /// The broker refused or picked an unadvertised version.
    Failed,
}

// ============================================================================
// Deadline
// ============================================================================

/// Optional bound on the handshake's busy-drain loops.
struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    fn check(&self) -> Result<()> {
        match self.limit {
            Some(limit) if self.started.elapsed() >= limit => Err(Error::timeout(
                "connect handshake",
                u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            )),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Handshake
// ============================================================================

impl<S: Socket> Connection<S> {
    /// Returns the handshake progress.
    #[inline]
    #[must_use]
    pub const fn handshake_state(&self) -> HandshakeState {
        self.handshake
    }

    /// Builds the CONNECT frame offered by this connection.
    ///
    /// Carries `accept-version` with every advertised version, then the
    /// client's CONNECT headers, then `headers`. Later headers replace
    /// earlier ones of the same name.
    pub fn connect_frame<I, K, V>(&self, headers: I) -> Frame
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut frame = Frame::new("CONNECT")
            .with_header(ACCEPT_VERSION_HEADER, self.client.versions().join(","));

        for (name, value) in self.client.connect_headers() {
            frame.set_header(name, value);
        }
        for (name, value) in headers {
            frame.set_header(name, value);
        }
        frame
    }

    /// Performs the handshake and returns the negotiated version together
    /// with the CONNECTED frame.
    ///
    /// Queues CONNECT, drives write ticks until it is on the wire, then
    /// drives read ticks until the first frame arrives. On success fires
    /// `Established`.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectFailed`] if the first frame is not CONNECTED
    /// - [`Error::UnsupportedProtocolVersion`] if its version was not advertised
    /// - [`Error::ConnectionClosed`] if the socket goes away mid-handshake
    /// - [`Error::Timeout`] if `connect_timeout_ms` elapses
    /// - [`Error::Config`] if the handshake was already attempted
    /// - errors surfaced by the reactor ticks
    pub fn connect<I, K, V>(&mut self, headers: I) -> Result<(String, Frame)>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if self.handshake != HandshakeState::Idle {
            return Err(Error::config(format!(
                "handshake already attempted ({:?})",
                self.handshake
            )));
        }

        let deadline = Deadline {
            started: Instant::now(),
            limit: self.config.connect_timeout(),
        };
        let advertised = self.client.versions();
        let connect = self.connect_frame(headers);

        debug!(connection = %self.id(), versions = %advertised.join(","), "Sending CONNECT");
        self.handshake = HandshakeState::AwaitingConnected;
        let connected = match self.await_connected(connect, &deadline) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(connection = %self.id(), error = %e, "Handshake aborted");
                self.handshake = HandshakeState::Failed;
                return Err(e);
            }
        };

        if connected.command != CONNECTED {
            warn!(connection = %self.id(), command = %connected.command, "Handshake refused");
            self.handshake = HandshakeState::Failed;
            return Err(Error::connect_failed(connected.command));
        }

        let version = match negotiate(&connected, &advertised) {
            Ok(version) => version,
            Err(e) => {
                warn!(connection = %self.id(), error = %e, "Handshake version rejected");
                self.handshake = HandshakeState::Failed;
                return Err(e);
            }
        };

        self.establish(&version);
        Ok((version, connected))
    }

    /// Applies a CONNECTED frame obtained elsewhere and installs client
    /// bindings.
    ///
    /// Sets the version from the frame's `version` header, or `1.0` without
    /// one, unless a version is already set. `bindings` maps event names
    /// (`terminated`, `died`, `established`) to listeners.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if a binding names an unknown event.
    pub fn configure<B, N>(&mut self, connected: &Frame, bindings: B) -> Result<()>
    where
        B: IntoIterator<Item = (N, EventCallback)>,
        N: AsRef<str>,
    {
        let version = version_of(connected);
        match self.version.as_deref() {
            None => self.set_version(version),
            Some(current) if current != version => {
                warn!(connection = %self.id(), current, ignored = version, "Version already negotiated");
            }
            Some(_) => {}
        }

        self.events.install(bindings)
    }

    /// Sends `connect` and returns the first frame received after it.
    fn await_connected(&mut self, connect: Frame, deadline: &Deadline) -> Result<Frame> {
        self.write_frame_nonblock(connect)?;

        let mut sent = false;
        while !sent {
            self.ensure_handshake_alive(deadline)?;
            self.process_write_with(|frame| sent |= frame.command == "CONNECT")?;
            std::hint::spin_loop();
        }

        let mut response: Option<Frame> = None;
        loop {
            self.ensure_handshake_alive(deadline)?;
            self.process_read_with(|frame| {
                if response.is_none() {
                    response = Some(frame.clone());
                }
            })?;
            if let Some(frame) = response.take() {
                return Ok(frame);
            }
            std::hint::spin_loop();
        }
    }

    fn ensure_handshake_alive(&self, deadline: &Deadline) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::ConnectionClosed);
        }
        deadline.check()
    }

    fn set_version(&mut self, version: &str) {
        self.serializer.set_version(version);
        self.version = Some(version.to_string());
    }

    fn establish(&mut self, version: &str) {
        self.set_version(version);
        self.handshake = HandshakeState::Established;
        self.link_state = LinkState::Established;

        info!(connection = %self.id(), version, "Connection established");
        self.trigger(EventKind::Established);
    }
}
