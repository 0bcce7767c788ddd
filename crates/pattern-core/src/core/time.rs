// pattern-core/src/core/time.rs
// ============================================================================
// Module: Pattern Core Time
// Description: Explicit timestamp representation supplied by hosts.
// Purpose: Keep the core deterministic and replayable.
// Dependencies: serde
// ============================================================================

//! The core never reads wall-clock time directly; hosts must supply
//! timestamps on every operation that needs "now". This keeps replays of
//! recorded event streams byte-for-byte deterministic.

use serde::Deserialize;
use serde::Serialize;

/// A host-supplied point in time, either wall-clock or a logical counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Milliseconds since the Unix epoch, supplied by the host clock.
    UnixMillis(i64),
    /// A monotonically increasing logical counter, used in deterministic tests.
    Logical(u64),
}

impl Timestamp {
    /// Returns the Unix-millis value if this timestamp carries one.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(millis) => Some(*millis),
            Self::Logical(_) => None,
        }
    }

    /// Returns the logical counter value if this timestamp carries one.
    #[must_use]
    pub const fn as_logical(&self) -> Option<u64> {
        match self {
            Self::Logical(tick) => Some(*tick),
            Self::UnixMillis(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "test assertions may unwrap, expect, or panic on failure"
    )]
    use super::*;

    #[test]
    fn unix_millis_accessor() {
        let ts = Timestamp::UnixMillis(1_700_000_000_000);
        assert_eq!(ts.as_unix_millis(), Some(1_700_000_000_000));
        assert_eq!(ts.as_logical(), None);
    }

    #[test]
    fn logical_accessor() {
        let ts = Timestamp::Logical(42);
        assert_eq!(ts.as_logical(), Some(42));
        assert_eq!(ts.as_unix_millis(), None);
    }

    #[test]
    fn ordering_is_derived_lexicographically() {
        assert!(Timestamp::Logical(1) < Timestamp::Logical(2));
    }
}
