//! Protocol message types.
//!
//! This module defines the frame model and the wire codec used between the
//! client (Rust) and a STOMP broker.
//!
//! # Protocol Overview
//!
//! | Frame | Direction | Purpose |
//! |-------|-----------|---------|
//! | `CONNECT` | Client → Broker | Open session, offer versions |
//! | `CONNECTED` | Broker → Client | Accept session, pick version |
//! | `SEND`, `SUBSCRIBE`, ... | Client → Broker | Commands |
//! | `MESSAGE`, `RECEIPT`, `ERROR` | Broker → Client | Deliveries and replies |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Supported client commands and shorthand resolution |
//! | `frame` | Frame value type |
//! | `serializer` | Serializer trait and STOMP codec |
//! | `version` | Version negotiation |

// ============================================================================
// Submodules
// ============================================================================

/// Supported client commands.
pub mod command;

/// Frame value type.
pub mod frame;

/// Wire codec.
pub mod serializer;

/// Version negotiation.
pub mod version;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, Operation};
pub use frame::Frame;
pub use serializer::{Serializer, StompSerializer};
pub use version::{DEFAULT_VERSION, ProtocolVersion, VERSION_HEADER, negotiate, version_of};
