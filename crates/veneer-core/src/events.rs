#![forbid(unsafe_code)]

//! Event keys and listener options.
//!
//! A view declares its handlers as `"event selector"` entries: `"click
//! .js-row"` binds a delegated click handler for descendants matching
//! `.js-row`. [`EventKey::parse`] splits the entry at the first run of
//! whitespace; an entry with no selector binds on the root itself.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Options passed to the platform adapter when registering a listener.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventOptions: u8 {
        /// Dispatch during the capture phase.
        const CAPTURE = 0b001;
        /// Remove the listener after its first dispatch.
        const ONCE    = 0b010;
        /// The listener never cancels the event.
        const PASSIVE = 0b100;
    }
}

/// A declared event binding: event name plus delegation selector.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventKey {
    /// Platform event name, e.g. `"click"`.
    pub event: String,
    /// Delegation selector; empty means the root itself.
    pub selector: String,
}

impl EventKey {
    /// Create a key from its parts.
    #[must_use]
    pub fn new(event: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            selector: selector.into(),
        }
    }

    /// Parse an `"event selector"` entry.
    ///
    /// The first whitespace run separates the event name from the selector;
    /// the selector may itself contain spaces. Returns `None` for an empty
    /// entry.
    #[must_use]
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }
        match entry.split_once(char::is_whitespace) {
            Some((event, selector)) => Some(Self::new(event, selector.trim_start())),
            None => Some(Self::new(entry, "")),
        }
    }

    /// Whether this key binds directly on the root (no selector).
    #[inline]
    #[must_use]
    pub fn is_root_binding(&self) -> bool {
        self.selector.is_empty()
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.selector.is_empty() {
            f.write_str(&self.event)
        } else {
            write!(f, "{} {}", self.event, self.selector)
        }
    }
}
