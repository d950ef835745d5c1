//! OnStomp connection core - non-blocking STOMP framing over a byte stream.
//!
//! This library owns one socket on behalf of a STOMP client and moves
//! frames across it without ever blocking the caller.
//!
//! # Architecture
//!
//! The core is driven by an external reactor loop:
//!
//! - **Outbound**: frames are serialized and queued; each write tick sends
//!   as much of the head entry as the socket accepts
//! - **Inbound**: each read tick reads up to one buffer of bytes and hands
//!   every decoded frame to the [`Client`]
//! - **Failures**: transient errors are retried, everything else closes the
//!   socket before it reaches the caller
//!
//! Key design principles:
//!
//! - A [`Connection`] owns exactly one socket and closes it exactly once
//! - The socket lifecycle ([`ConnectionState`]) and the protocol link
//!   ([`LinkState`]) are tracked separately
//! - The client is a shared trait object the core never mutates
//!
//! # Quick Start
//!
//! ```no_run
//! use std::net::TcpStream;
//! use std::sync::Arc;
//!
//! use onstomp_core::{Client, Connection, Result, StompSerializer, TcpSocket};
//!
//! struct Subscriber;
//!
//! impl Client for Subscriber {
//!     fn versions(&self) -> Vec<String> {
//!         vec!["1.0".into(), "1.1".into()]
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let socket = TcpSocket::new(TcpStream::connect("127.0.0.1:61613")?)?;
//!     let mut connection =
//!         Connection::new(socket, Arc::new(Subscriber), Box::new(StompSerializer::new()));
//!
//!     let (version, _connected) = connection.connect([("login", "guest")])?;
//!     println!("Negotiated STOMP {version}");
//!
//!     connection.invoke("subscribe_frame", [("destination", "/queue/a")], "")?;
//!     loop {
//!         connection.process()?;
//!     }
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | The [`Client`] seam |
//! | [`connection`] | State machine, reactor ticks, handshake, events |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Frames, commands, versions and the wire codec |
//! | [`transport`] | Socket trait, TCP and in-memory sockets |

// ============================================================================
// Modules
// ============================================================================

/// Client seam.
///
/// The connection reports transmitted and received frames to a [`Client`].
pub mod client;

/// Connection core.
///
/// Start with [`Connection::new`] around an open socket.
pub mod connection;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// STOMP frame model and wire codec.
pub mod protocol;

/// Byte-stream transport layer.
///
/// Sockets are opened by the caller and handed to the connection.
pub mod transport;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Client seam
pub use client::Client;

// Connection types
pub use connection::{
    Connection, ConnectionConfig, ConnectionEvent, ConnectionState, EventKind, HandshakeState,
    LinkState,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::ConnectionId;

// Protocol types
pub use protocol::{Command, Frame, ProtocolVersion, Serializer, StompSerializer};

// Transport types
pub use transport::{MemorySocket, Socket, TcpSocket};
