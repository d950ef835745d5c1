//! Frame serialization.
//!
//! [`Serializer`] is the seam between the connection core and the wire
//! format. The connection only asks it to turn a frame into bytes and to
//! turn received bytes into zero or more frames; buffering of partial frames
//! is the serializer's job.
//!
//! # Wire Format
//!
//! ```text
//! COMMAND\n
//! name:value\n
//! ...
//! \n
//! body\0
//! ```
//!
//! Bare EOLs between frames are heart-beats and are skipped. A body may
//! contain NUL bytes only when `content-length` is given.

// ============================================================================
// Imports
// ============================================================================

use tracing::trace;

use crate::error::{Error, Result};

use super::{Frame, ProtocolVersion};

// ============================================================================
// Serializer Trait
// ============================================================================

/// Converts frames to wire bytes and wire bytes to frames.
pub trait Serializer: Send {
    /// Serializes `frame` into wire bytes.
    ///
    /// # Errors
    ///
    /// [`Error::Frame`] if the frame cannot be represented on the wire.
    fn encode(&mut self, frame: &Frame) -> Result<Vec<u8>>;

    /// Feeds received bytes and returns every frame they complete.
    ///
    /// Bytes of an incomplete trailing frame are kept for the next call.
    ///
    /// # Errors
    ///
    /// [`Error::Frame`] if the buffered input is malformed.
    fn decode(&mut self, bytes: &[u8]) -> Result<Vec<Frame>>;

    /// Switches wire rules after version negotiation.
    fn set_version(&mut self, _version: &str) {}
}

// ============================================================================
// StompSerializer
// ============================================================================

/// Largest `content-length` accepted from a peer.
pub const MAX_CONTENT_LENGTH: usize = 16 * 1024 * 1024;

/// STOMP 1.0 / 1.1 codec.
#[derive(Debug, Default)]
pub struct StompSerializer {
    /// Wire rules in effect.
    version: ProtocolVersion,
    /// Received bytes not yet forming a complete frame.
    buffer: Vec<u8>,
    /// Line start up to which the pending head has been scanned without
    /// finding its blank line.
    head_scan: usize,
}

/// Frame head boundaries found in the buffer.
struct Head {
    /// Index of the first body byte.
    body_start: usize,
    /// Parsed frame without body.
    frame: Frame,
}

impl StompSerializer {
    /// Creates a serializer speaking STOMP 1.0.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a serializer speaking `version`.
    #[inline]
    #[must_use]
    pub fn with_version(version: ProtocolVersion) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// Returns the wire rules in effect.
    #[inline]
    #[must_use]
    pub const fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Returns the number of buffered bytes awaiting a complete frame.
    #[inline]
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if headers of `command` are escaped on the wire.
    fn escapes(&self, command: &str) -> bool {
        self.version.escapes_headers() && command != "CONNECT" && command != "CONNECTED"
    }

    /// Drops heart-beat EOLs at the front of the buffer.
    fn skip_heartbeats(&mut self) {
        let skip = self
            .buffer
            .iter()
            .take_while(|&&b| b == b'\n' || b == b'\r')
            .count();
        if skip > 0 {
            self.buffer.drain(..skip);
            self.head_scan = 0;
        }
    }

    /// Finds the index just past the blank line ending the head.
    ///
    /// Resumes where the previous call stopped, so a head arriving in many
    /// small reads is scanned once.
    fn find_head_end(&mut self) -> Option<usize> {
        let mut pos = self.head_scan;

        while let Some(offset) = self.buffer[pos..].iter().position(|&b| b == b'\n') {
            let end = pos + offset;
            if pos > 0 && strip_cr(&self.buffer[pos..end]).is_empty() {
                return Some(end + 1);
            }
            pos = end + 1;
        }

        self.head_scan = pos;
        None
    }

    /// Parses the command and header block ending at `body_start`.
    fn parse_head(&self, body_start: usize) -> Result<Head> {
        let mut lines = self.buffer[..body_start]
            .split(|&b| b == b'\n')
            .map(strip_cr);

        let command_line = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| Error::frame("missing command line"))?;
        let command = utf8(command_line)?;
        let escaped = self.escapes(command);
        let mut frame = Frame::new(command);

        for line in lines.take_while(|line| !line.is_empty()) {
            let line = utf8(line)?;
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::frame(format!("malformed header line: {line}")))?;

            if escaped {
                frame.push_header(unescape(name)?, unescape(value)?);
            } else {
                frame.push_header(name, value);
            }
        }

        Ok(Head { body_start, frame })
    }

    /// Extracts one complete frame from the front of the buffer.
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.skip_heartbeats();
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let Some(head_end) = self.find_head_end() else {
            return Ok(None);
        };
        let Head {
            body_start,
            mut frame,
        } = self.parse_head(head_end)?;

        let body_end = match frame.content_length() {
            Some(length) => {
                let end = body_start
                    .checked_add(length)
                    .filter(|_| length <= MAX_CONTENT_LENGTH)
                    .ok_or_else(|| {
                        Error::frame(format!(
                            "{} content-length {length} out of range",
                            frame.command
                        ))
                    })?;
                if self.buffer.len() <= end {
                    return Ok(None);
                }
                if self.buffer[end] != 0 {
                    return Err(Error::frame(format!(
                        "{} body exceeds content-length {length}",
                        frame.command
                    )));
                }
                end
            }
            None => match self.buffer[body_start..].iter().position(|&b| b == 0) {
                Some(offset) => body_start + offset,
                None => return Ok(None),
            },
        };

        frame.body = self.buffer[body_start..body_end].to_vec();
        self.buffer.drain(..=body_end);
        self.head_scan = 0;

        trace!(command = %frame.command, body = frame.body.len(), "Frame decoded");
        Ok(Some(frame))
    }
}

impl Serializer for StompSerializer {
    fn encode(&mut self, frame: &Frame) -> Result<Vec<u8>> {
        if frame.command.is_empty() || frame.command.contains('\n') {
            return Err(Error::frame(format!("invalid command: {:?}", frame.command)));
        }

        let escaped = self.escapes(&frame.command);
        let mut out = Vec::with_capacity(frame.command.len() + frame.body.len() + 64);

        out.extend_from_slice(frame.command.as_bytes());
        out.push(b'\n');

        for (name, value) in &frame.headers {
            if escaped {
                out.extend_from_slice(escape(name).as_bytes());
                out.push(b':');
                out.extend_from_slice(escape(value).as_bytes());
            } else {
                if name.contains(['\n', ':']) || value.contains('\n') {
                    return Err(Error::frame(format!(
                        "header {name:?} cannot be sent unescaped"
                    )));
                }
                out.extend_from_slice(name.as_bytes());
                out.push(b':');
                out.extend_from_slice(value.as_bytes());
            }
            out.push(b'\n');
        }

        if !frame.body.is_empty() && !frame.has_header("content-length") {
            out.extend_from_slice(format!("content-length:{}\n", frame.body.len()).as_bytes());
        }

        out.push(b'\n');
        out.extend_from_slice(&frame.body);
        out.push(0);

        Ok(out)
    }

    fn decode(&mut self, bytes: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn set_version(&mut self, version: &str) {
        // Unknown versions are newer than 1.0, so they escape.
        self.version = version.parse().unwrap_or(ProtocolVersion::V1_1);
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::frame(format!("invalid UTF-8: {e}")))
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            other => {
                return Err(Error::frame(format!(
                    "invalid escape sequence \\{}",
                    other.map(String::from).unwrap_or_default()
                )));
            }
        }
    }
    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================
