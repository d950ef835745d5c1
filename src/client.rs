//! Client seam.
//!
//! The connection core does not own the client. It reads the advertised
//! versions and CONNECT headers from it during the handshake and reports
//! every frame that fully leaves or arrives on the socket.

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;
use crate::protocol::Frame;

// ============================================================================
// Client Trait
// ============================================================================

/// Owner of a [`Connection`](crate::Connection).
///
/// All methods take `&self`; implementations needing mutable state use
/// interior mutability.
///
/// # Example
///
/// ```
/// use onstomp_core::{Client, Frame, Result};
///
/// struct Printer;
///
/// impl Client for Printer {
///     fn versions(&self) -> Vec<String> {
///         vec!["1.0".into(), "1.1".into()]
///     }
///
///     fn on_frame_received(&self, frame: &Frame) -> Result<()> {
///         println!("<- {frame}");
///         Ok(())
///     }
/// }
/// ```
pub trait Client: Send + Sync {
    /// Protocol versions offered in CONNECT, in preference order.
    fn versions(&self) -> Vec<String>;

    /// Headers added to every CONNECT frame (`host`, `login`, ...).
    fn connect_headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Called once a frame has been completely written to the socket.
    ///
    /// # Errors
    ///
    /// An error here is a failure of the write tick; the connection is
    /// closed and the error is surfaced.
    fn on_frame_transmitted(&self, _frame: &Frame) -> Result<()> {
        Ok(())
    }

    /// Called for every frame decoded from the socket, in wire order.
    ///
    /// # Errors
    ///
    /// An error here is a failure of the read tick; the connection is
    /// closed and the error is surfaced.
    fn on_frame_received(&self, _frame: &Frame) -> Result<()> {
        Ok(())
    }
}
