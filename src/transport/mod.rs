//! Socket transport layer.
//!
//! This module defines the byte-stream seam the connection core drives and
//! two implementations of it.
//!
//! Transport establishment (DNS, TCP connect, TLS) happens before the core
//! sees the socket: a [`Connection`](crate::Connection) is always built
//! around an already-open stream.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   poll / read / write    ┌─────────────────┐
//! │  Connection     │ ───────────────────────► │  Socket         │
//! │  (reactor tick) │      non-blocking        │  TcpSocket      │
//! │                 │ ◄─────────────────────── │  MemorySocket   │
//! └─────────────────┘                          └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `socket` | The [`Socket`] trait |
//! | `tcp` | Non-blocking TCP with mio readiness |
//! | `memory` | In-process socket pair |

// ============================================================================
// Submodules
// ============================================================================

/// In-process socket pair.
pub mod memory;

/// Socket trait.
pub mod socket;

/// Non-blocking TCP socket.
pub mod tcp;

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::MemorySocket;
pub use socket::Socket;
pub use tcp::TcpSocket;
