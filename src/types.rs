//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `SessionId`: monotonic integer issued at connect time
//! - `RoomId`: normalized room identifier used in commands

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique session identifier (newtype pattern)
///
/// Issued by the registry from a monotonic counter, starting at 1.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Default display name for a freshly connected session
    pub fn default_username(&self) -> String {
        format!("User{}", self.0)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic allocator for session identifiers
#[derive(Debug, Default)]
pub struct SessionIdAllocator {
    last: AtomicU64,
}

impl SessionIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next identifier
    pub fn next_id(&self) -> SessionId {
        SessionId(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Room identifier (lowercase, spaces replaced by underscores)
///
/// Derived from a room's display name on creation, and from the
/// argument of `/join` on lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub String);

impl RoomId {
    /// Normalize free text into a room id
    pub fn normalize(name: &str) -> Self {
        Self(name.trim().replace(' ', "_").to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_monotonic() {
        let ids = SessionIdAllocator::new();
        let first = ids.next_id();
        let second = ids.next_id();
        assert_eq!(first, SessionId(1));
        assert_eq!(second, SessionId(2));
        assert!(second > first);
    }

    #[test]
    fn test_default_username() {
        assert_eq!(SessionId(7).default_username(), "User7");
    }

    #[test]
    fn test_room_id_normalize() {
        assert_eq!(RoomId::normalize("My Room").as_str(), "my_room");
        assert_eq!(RoomId::normalize("General"), RoomId::normalize("general"));
        assert_eq!(RoomId::normalize("  Rust  Talk ").as_str(), "rust__talk");
    }
}
