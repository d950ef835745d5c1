//! Supported frame commands and command-shaped operation names.
//!
//! # Client Commands
//!
//! | Command | Versions | Required headers |
//! |---------|----------|------------------|
//! | `CONNECT` | all | `accept-version` (1.1) |
//! | `SEND` | all | `destination` |
//! | `SUBSCRIBE` | all | `destination` |
//! | `UNSUBSCRIBE` | all | `id` or `destination` |
//! | `BEGIN` / `COMMIT` / `ABORT` | all | `transaction` |
//! | `ACK` | all | `message-id` |
//! | `NACK` | 1.1 | `message-id`, `subscription` |
//! | `DISCONNECT` | all | none |
//!
//! Operation names of the form `<command>_frame` (e.g. `send_frame`) map to
//! these commands. Any other `_frame` name is an unsupported command; names
//! without the suffix are not operations at all.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::ProtocolVersion;

// ============================================================================
// Constants
// ============================================================================

/// Suffix marking an operation name as a frame shorthand.
const FRAME_SUFFIX: &str = "_frame";

// ============================================================================
// Command
// ============================================================================

/// Closed set of commands a client connection may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Command {
    /// Open a session.
    Connect,
    /// Publish a message.
    Send,
    /// Register a subscription.
    Subscribe,
    /// Drop a subscription.
    Unsubscribe,
    /// Start a transaction.
    Begin,
    /// Commit a transaction.
    Commit,
    /// Roll back a transaction.
    Abort,
    /// Acknowledge a message.
    Ack,
    /// Reject a message (1.1 only).
    Nack,
    /// Close the session.
    Disconnect,
}

impl Command {
    /// Returns the wire spelling of the command.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Disconnect => "DISCONNECT",
        }
    }

    /// Returns `true` if the command exists in `version`.
    ///
    /// Versions unknown to this crate are treated as 1.1-compatible.
    #[must_use]
    pub fn supported_in(self, version: &str) -> bool {
        match self {
            Self::Nack => version
                .parse::<ProtocolVersion>()
                .map_or(true, |v| v != ProtocolVersion::V1_0),
            _ => true,
        }
    }

    /// Returns the headers a frame of this command must carry in `version`.
    #[must_use]
    pub fn required_headers(self, version: &str) -> &'static [&'static str] {
        match self {
            Self::Send | Self::Subscribe => &["destination"],
            Self::Begin | Self::Commit | Self::Abort => &["transaction"],
            Self::Ack if version == "1.0" => &["message-id"],
            Self::Ack | Self::Nack => &["message-id", "subscription"],
            Self::Connect | Self::Unsubscribe | Self::Disconnect => &[],
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = Error;

    /// Parses a command name case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let command = match s.to_ascii_uppercase().as_str() {
            "CONNECT" => Self::Connect,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "BEGIN" => Self::Begin,
            "COMMIT" => Self::Commit,
            "ABORT" => Self::Abort,
            "ACK" => Self::Ack,
            "NACK" => Self::Nack,
            "DISCONNECT" => Self::Disconnect,
            _ => return Err(Error::unsupported_command(s)),
        };
        Ok(command)
    }
}

// ============================================================================
// Operation
// ============================================================================

/// A resolved operation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Build and enqueue a frame of this command.
    Frame(Command),
}

impl Operation {
    /// Resolves an operation name.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedCommand`] for `<name>_frame` where `<name>` is
    ///   not a [`Command`]
    /// - [`Error::NoSuchOperation`] for anything else
    pub fn resolve(name: &str) -> Result<Self> {
        match name.strip_suffix(FRAME_SUFFIX) {
            Some(command) if !command.is_empty() => command.parse().map(Self::Frame),
            _ => Err(Error::no_such_operation(name)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
