//! Lifecycle event registry.
//!
//! Three independent listener lists, one per [`EventKind`]. Listeners are
//! only ever appended, and triggering an event calls every listener of that
//! kind in subscription order.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;

// ============================================================================
// Types
// ============================================================================

/// Listener callback.
///
/// Receives a snapshot of the connection at the moment the event fired.
pub type EventCallback = Box<dyn FnMut(&ConnectionEvent) + Send>;

// ============================================================================
// EventKind
// ============================================================================

/// Connection lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A tick failed with a non-I/O error and the socket was closed.
    Terminated,
    /// An established link stopped being live. Fires at most once.
    Died,
    /// The handshake completed.
    Established,
}

impl EventKind {
    /// Every event kind.
    pub const ALL: [Self; 3] = [Self::Terminated, Self::Died, Self::Established];

    /// Returns the binding name of the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Terminated => "terminated",
            Self::Died => "died",
            Self::Established => "established",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::config(format!("unknown connection event: {s}")))
    }
}

// ============================================================================
// ConnectionEvent
// ============================================================================

/// Payload handed to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    /// Connection that fired the event.
    pub connection_id: ConnectionId,
    /// Event that fired.
    pub kind: EventKind,
    /// Negotiated version, if the handshake has completed.
    pub version: Option<String>,
}

// ============================================================================
// EventRegistry
// ============================================================================

/// Ordered listener lists keyed by event kind.
#[derive(Default)]
pub struct EventRegistry {
    /// Listeners per kind, in subscription order.
    listeners: FxHashMap<EventKind, Vec<EventCallback>>,
}

impl EventRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener for `kind`.
    pub fn subscribe(&mut self, kind: EventKind, callback: EventCallback) {
        self.listeners.entry(kind).or_default().push(callback);
    }

    /// Installs listeners keyed by binding name.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if a name is not an [`EventKind`]. Bindings before
    /// the bad name stay installed.
    pub fn install<I, S>(&mut self, bindings: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, EventCallback)>,
        S: AsRef<str>,
    {
        for (name, callback) in bindings {
            let kind = name.as_ref().parse()?;
            self.subscribe(kind, callback);
        }
        Ok(())
    }

    /// Calls every listener of `event.kind` in subscription order.
    pub fn trigger(&mut self, event: &ConnectionEvent) {
        let Some(listeners) = self.listeners.get_mut(&event.kind) else {
            return;
        };

        trace!(
            connection = %event.connection_id,
            event = %event.kind,
            listeners = listeners.len(),
            "Triggering event"
        );

        for listener in listeners.iter_mut() {
            listener(event);
        }
    }

    /// Returns the number of listeners for `kind`.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("terminated", &self.count(EventKind::Terminated))
            .field("died", &self.count(EventKind::Died))
            .field("established", &self.count(EventKind::Established))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
