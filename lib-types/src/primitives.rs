//! Canonical primitive types for the partner network domain.
//!
//! These are the foundational building blocks for all domain state. They are
//! designed to be:
//! - Cheap to clone and compare
//! - Deterministically serializable
//! - Impossible to confuse with one another at the type level

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

// ============================================================================
// TYPE ALIASES
// ============================================================================

/// Balance amounts in minor units (cents), points, or tokens
pub type Amount = u64;

/// Signed ledger deltas (credits positive, debits negative)
pub type SignedAmount = i64;

/// Basis points for weight calculations (10000 = 100%)
pub type Bps = u16;

/// Unix epoch seconds
pub type UnixTime = u64;

/// Current wall-clock time as unix epoch seconds
pub fn now_unix() -> UnixTime {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Member identifier, assigned at registration by the account system
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct MemberId(String);

impl MemberId {
    /// Create a member id from its string form
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemberId({})", self.0)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MemberId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for MemberId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Upstream event identifier (order completion, enrollment purchase).
///
/// Supplied by the event source and used as the idempotence key; the same id
/// may be delivered more than once.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct EventId(String);

impl EventId {
    /// Create an event id from its string form
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for EventId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_id_basics() {
        let id = MemberId::new("M1");
        assert_eq!(id.as_str(), "M1");
        assert_eq!(format!("{}", id), "M1");

        let from_str: MemberId = "M2".into();
        assert_ne!(id, from_str);
    }

    #[test]
    fn test_event_id_basics() {
        let id = EventId::new("evt_001");
        assert_eq!(id.as_str(), "evt_001");
        assert_eq!(id, EventId::from("evt_001"));
    }

    #[test]
    fn test_now_unix_is_sane() {
        // 2020-01-01 as a lower bound
        assert!(now_unix() > 1_577_836_800);
    }
}
