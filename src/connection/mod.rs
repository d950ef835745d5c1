//! Connection core.
//!
//! Owns the socket, queues outbound frames, runs reactor ticks and the
//! handshake, and fires lifecycle events.
//!
//! # Data Flow
//!
//! ```text
//! Client ──frame──► Serializer::encode ──bytes──► WriteQueue ──write tick──► Socket
//! Socket ──read tick──► Serializer::decode ──frames──► Client + observer
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `classify` | Failure dispositions for ticks |
//! | `config` | Connection tunables |
//! | `core` | State machine and reactor |
//! | `events` | Lifecycle listener registry |
//! | `handshake` | CONNECT / CONNECTED exchange |
//! | `write_queue` | Outbound FIFO |

// ============================================================================
// Submodules
// ============================================================================

/// Failure classification.
pub mod classify;

/// Connection tunables.
pub mod config;

/// State machine and reactor ticks.
pub mod core;

/// Lifecycle events.
pub mod events;

/// Handshake protocol.
pub mod handshake;

/// Outbound write queue.
pub mod write_queue;


// ============================================================================
// Re-exports
// ============================================================================

pub use classify::{Direction, Disposition};
pub use config::{ConnectionConfig, MAX_BYTES_PER_READ};
pub use self::core::{Connection, ConnectionState, LinkState};
pub use events::{ConnectionEvent, EventCallback, EventKind, EventRegistry};
pub use handshake::HandshakeState;
pub use write_queue::WriteQueue;
