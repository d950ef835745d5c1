//! Protocol version negotiation.
//!
//! The broker picks a version from the client's `accept-version` list and
//! reports it in the CONNECTED `version` header. A missing header means the
//! broker only speaks 1.0.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::Frame;

// ============================================================================
// Constants
// ============================================================================

/// Version assumed when CONNECTED carries no `version` header.
pub const DEFAULT_VERSION: &str = "1.0";

/// Name of the header carrying the negotiated version.
pub const VERSION_HEADER: &str = "version";

// ============================================================================
// ProtocolVersion
// ============================================================================

/// Protocol versions with wire rules known to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// STOMP 1.0: no header escaping, no NACK.
    #[default]
    #[serde(rename = "1.0")]
    V1_0,
    /// STOMP 1.1: escaped headers, NACK.
    #[serde(rename = "1.1")]
    V1_1,
}

impl ProtocolVersion {
    /// Every version this crate can speak, oldest first.
    pub const ALL: [Self; 2] = [Self::V1_0, Self::V1_1];

    /// Returns the wire spelling of the version.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1_0 => "1.0",
            Self::V1_1 => "1.1",
        }
    }

    /// Returns `true` if header names and values are escaped on the wire.
    #[inline]
    #[must_use]
    pub const fn escapes_headers(self) -> bool {
        matches!(self, Self::V1_1)
    }

    /// Returns the wire spelling of every supported version.
    #[must_use]
    pub fn all_strings() -> Vec<String> {
        Self::ALL.iter().map(|v| v.as_str().to_string()).collect()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1.0" => Ok(Self::V1_0),
            "1.1" => Ok(Self::V1_1),
            other => Err(Error::unsupported_version(other, &Self::all_strings())),
        }
    }
}

// ============================================================================
// Negotiation
// ============================================================================

/// Returns the version named by `connected`, or [`DEFAULT_VERSION`].
#[must_use]
pub fn version_of(connected: &Frame) -> &str {
    connected.header(VERSION_HEADER).unwrap_or(DEFAULT_VERSION)
}

/// Checks the version of a CONNECTED frame against the advertised list.
///
/// A frame without a `version` header negotiates [`DEFAULT_VERSION`]
/// without consulting `advertised`.
///
/// # Errors
///
/// [`Error::UnsupportedProtocolVersion`] if the frame names a version that
/// is not in `advertised`.
pub fn negotiate(connected: &Frame, advertised: &[String]) -> Result<String> {
    match connected.header(VERSION_HEADER) {
        None => Ok(DEFAULT_VERSION.to_string()),
        Some(version) if advertised.iter().any(|v| v == version) => Ok(version.to_string()),
        Some(version) => Err(Error::unsupported_version(version, advertised)),
    }
}

// ============================================================================
// Tests
// ============================================================================
