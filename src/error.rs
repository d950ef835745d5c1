//! Error types for the STOMP connection core.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use onstomp_core::{Error, Result};
//!
//! fn tick(connection: &mut Connection<TcpSocket>) -> Result<()> {
//!     connection.process()?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::ConnectionClosed`], [`Error::Timeout`] |
//! | Handshake | [`Error::ConnectFailed`], [`Error::UnsupportedProtocolVersion`] |
//! | Dispatch | [`Error::UnsupportedCommand`], [`Error::NoSuchOperation`], [`Error::Dispatch`] |
//! | Wire | [`Error::Frame`] |
//! | External | [`Error::Io`], [`Error::Json`] |
//!
//! How a failure raised inside a reactor tick is handled (retried, treated
//! as a clean close, or surfaced) is decided by
//! [`Disposition`](crate::connection::Disposition), not by the variant
//! alone.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::io::ErrorKind;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when connection configuration or event bindings are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The peer closed the stream.
    ///
    /// Returned when an operation needs a live socket and the connection
    /// has already gone away.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Operation timeout.
    ///
    /// Returned when a bounded busy-drain exceeds its configured limit.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Handshake Errors
    // ========================================================================
    /// The broker answered CONNECT with something other than CONNECTED.
    #[error("Connect failed: expected CONNECTED, received {command}")]
    ConnectFailed {
        /// Command of the frame received in place of CONNECTED.
        command: String,
    },

    /// The broker selected a protocol version the client never offered.
    #[error("Unsupported protocol version {version} (advertised: {supported})")]
    UnsupportedProtocolVersion {
        /// Version named by the CONNECTED frame.
        version: String,
        /// Comma separated list of advertised versions.
        supported: String,
    },

    // ========================================================================
    // Dispatch Errors
    // ========================================================================
    /// A frame shorthand named a command this connection does not support.
    #[error("Unsupported command: {command}")]
    UnsupportedCommand {
        /// The unrecognized command name.
        command: String,
    },

    /// An operation name that is not shaped like a frame command.
    #[error("No such operation: {name}")]
    NoSuchOperation {
        /// The unknown operation name.
        name: String,
    },

    /// A client dispatch hook failed.
    #[error("Dispatch failed: {message}")]
    Dispatch {
        /// Description of the hook failure.
        message: String,
    },

    // ========================================================================
    // Wire Errors
    // ========================================================================
    /// Frame could not be encoded or decoded.
    #[error("Frame error: {message}")]
    Frame {
        /// Description of the malformed input.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a connect failed error.
    #[inline]
    pub fn connect_failed(command: impl Into<String>) -> Self {
        Self::ConnectFailed {
            command: command.into(),
        }
    }

    /// Creates an unsupported protocol version error.
    #[inline]
    pub fn unsupported_version(version: impl Into<String>, supported: &[String]) -> Self {
        Self::UnsupportedProtocolVersion {
            version: version.into(),
            supported: supported.join(","),
        }
    }

    /// Creates an unsupported command error.
    #[inline]
    pub fn unsupported_command(command: impl Into<String>) -> Self {
        Self::UnsupportedCommand {
            command: command.into(),
        }
    }

    /// Creates a no such operation error.
    #[inline]
    pub fn no_such_operation(name: impl Into<String>) -> Self {
        Self::NoSuchOperation { name: name.into() }
    }

    /// Creates a dispatch error.
    #[inline]
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }

    /// Creates a frame error.
    #[inline]
    pub fn frame(message: impl Into<String>) -> Self {
        Self::Frame {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this error came from the handshake.
    #[inline]
    #[must_use]
    pub fn is_handshake_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailed { .. } | Self::UnsupportedProtocolVersion { .. }
        )
    }

    /// Returns `true` if this is a transient I/O condition.
    ///
    /// Such conditions are recovered inside the reactor and never reach
    /// callers of a tick.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock)
        )
    }

    /// Returns `true` if this error means the peer went away.
    #[inline]
    #[must_use]
    pub fn is_remote_closed(&self) -> bool {
        match self {
            Self::ConnectionClosed => true,
            Self::Io(e) => matches!(
                e.kind(),
                ErrorKind::UnexpectedEof
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::NotConnected
            ),
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
