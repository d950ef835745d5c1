//! Frame value type.
//!
//! A frame is a command, an ordered list of headers and an opaque body.
//! Encoding to and from wire bytes lives in [`serializer`](super::serializer).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Frame
// ============================================================================

/// One protocol message unit.
///
/// Headers keep their insertion order. When a name repeats, lookups return
/// the first occurrence.
///
/// # Example
///
/// ```
/// use onstomp_core::Frame;
///
/// let frame = Frame::new("SEND")
///     .with_header("destination", "/queue/a")
///     .with_body("hello");
///
/// assert_eq!(frame.header("destination"), Some("/queue/a"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Frame command (e.g. `CONNECT`, `SEND`).
    pub command: String,

    /// Headers in wire order.
    pub headers: Vec<(String, String)>,

    /// Frame body.
    #[serde(default)]
    pub body: Vec<u8>,
}

// ============================================================================
// Constructors
// ============================================================================

impl Frame {
    /// Creates a frame with no headers and an empty body.
    #[inline]
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Adds a header, replacing any existing header with the same name.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Sets the body.
    #[inline]
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

// ============================================================================
// Header Access
// ============================================================================

impl Frame {
    /// Returns the first value of header `name`.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns `true` if header `name` is present.
    #[inline]
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// Sets header `name`.
    ///
    /// Replaces the first existing occurrence in place so wire order is
    /// kept; appends otherwise.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.headers.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    /// Appends a header without checking for an existing one.
    ///
    /// Used by decoders, which must keep repeated headers as received.
    #[inline]
    pub fn push_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Removes every occurrence of header `name`.
    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(key, _)| key != name);
    }

    /// Returns the parsed `content-length` header, if present and numeric.
    #[must_use]
    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length")
            .and_then(|value| value.trim().parse().ok())
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} headers, {} bytes)",
            self.command,
            self.headers.len(),
            self.body.len()
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_is_empty() {
        let frame = Frame::new("CONNECT");
        assert_eq!(frame.command, "CONNECT");
        assert!(frame.headers.is_empty());
        assert!(frame.body.is_empty());
    }

    #[test]
    fn test_set_header_replaces_in_place() {
        let mut frame = Frame::new("SEND")
            .with_header("destination", "/queue/a")
            .with_header("receipt", "1");
        frame.set_header("destination", "/queue/b");

        assert_eq!(frame.headers[0], ("destination".into(), "/queue/b".into()));
        assert_eq!(frame.headers.len(), 2);
    }

    #[test]
    fn test_repeated_header_first_wins() {
        let mut frame = Frame::new("MESSAGE");
        frame.push_header("foo", "first");
        frame.push_header("foo", "second");

        assert_eq!(frame.header("foo"), Some("first"));
        assert_eq!(frame.headers.len(), 2);
    }

    #[test]
    fn test_remove_header() {
        let mut frame = Frame::new("SEND").with_header("a", "1").with_header("b", "2");
        frame.remove_header("a");
        assert!(!frame.has_header("a"));
        assert!(frame.has_header("b"));
    }

    #[test]
    fn test_content_length() {
        let frame = Frame::new("SEND").with_header("content-length", "12");
        assert_eq!(frame.content_length(), Some(12));

        let bogus = Frame::new("SEND").with_header("content-length", "abc");
        assert_eq!(bogus.content_length(), None);
    }

    #[test]
    fn test_display() {
        let frame = Frame::new("SEND").with_header("a", "1").with_body("hi");
        assert_eq!(frame.to_string(), "SEND (1 headers, 2 bytes)");
    }
}
