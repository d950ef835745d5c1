//! Connection configuration.
//!
//! # Example
//!
//! ```
//! use onstomp_core::ConnectionConfig;
//!
//! let config = ConnectionConfig::new()
//!     .with_max_bytes_per_read(8192)
//!     .with_connect_timeout_ms(5_000);
//!
//! assert!(config.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default cap on bytes taken by a single non-blocking read.
pub const MAX_BYTES_PER_READ: usize = 4096;

// ============================================================================
// ConnectionConfig
// ============================================================================

/// Tunables of a [`Connection`](crate::Connection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Maximum bytes requested by one read attempt.
    pub max_bytes_per_read: usize,

    /// Readiness poll timeout in milliseconds. Zero checks without waiting.
    pub poll_timeout_ms: u64,

    /// Limit on the whole handshake, `None` for no limit.
    pub connect_timeout_ms: Option<u64>,

    /// Limit on a busy-drain flush, `None` for no limit.
    pub flush_timeout_ms: Option<u64>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ConnectionConfig {
    /// Creates a configuration with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_bytes_per_read: MAX_BYTES_PER_READ,
            poll_timeout_ms: 0,
            connect_timeout_ms: None,
            flush_timeout_ms: None,
        }
    }

    /// Parses a configuration from JSON; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the document is not valid
    /// - [`Error::Config`] if a value is out of range
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ConnectionConfig {
    /// Sets the per-read byte cap.
    #[inline]
    #[must_use]
    pub fn with_max_bytes_per_read(mut self, bytes: usize) -> Self {
        self.max_bytes_per_read = bytes;
        self
    }

    /// Sets the readiness poll timeout.
    #[inline]
    #[must_use]
    pub fn with_poll_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.poll_timeout_ms = timeout_ms;
        self
    }

    /// Bounds the handshake.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = Some(timeout_ms);
        self
    }

    /// Bounds the busy-drain flush.
    #[inline]
    #[must_use]
    pub fn with_flush_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.flush_timeout_ms = Some(timeout_ms);
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl ConnectionConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `max_bytes_per_read` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_bytes_per_read == 0 {
            return Err(Error::config("max_bytes_per_read must be greater than zero"));
        }
        Ok(())
    }

    /// Returns the readiness poll timeout.
    #[inline]
    #[must_use]
    pub const fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// Returns the handshake limit.
    #[inline]
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    /// Returns the flush limit.
    #[inline]
    #[must_use]
    pub fn flush_timeout(&self) -> Option<Duration> {
        self.flush_timeout_ms.map(Duration::from_millis)
    }
}

// ============================================================================
// Tests
// ============================================================================
