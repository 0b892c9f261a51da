//! External collaborator interfaces: attendance ledger and identity info.
//!
//! The core requests session opens/closes and descriptive lookups through
//! these traits; durability and schema belong to the implementations.

use crate::types::IdentityId;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Opaque token identifying one open attendance interval.
///
/// Produced by the ledger on open and passed back unchanged to close. The
/// tracker stores it but never inspects its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub i64);

/// A ledger write failed. The tracker's in-memory state is kept; see
/// [`PresenceTracker`](crate::tracker::PresenceTracker) for the recovery
/// policy.
#[derive(Debug, Error)]
#[error("ledger write failed: {0}")]
pub struct LedgerError(String);

impl LedgerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Attendance ledger port: opens and closes session records.
///
/// The core guarantees that successful calls per identity strictly alternate
/// open, close, open, close, … with non-decreasing timestamps; the port owns
/// durability.
pub trait AttendanceLedger {
    fn open(&mut self, identity: IdentityId, at: DateTime<Utc>) -> Result<SessionHandle, LedgerError>;

    fn close(&mut self, handle: SessionHandle, at: DateTime<Utc>) -> Result<(), LedgerError>;
}

/// Descriptive attributes of a known identity, for presentation only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityInfo {
    pub name: String,
    pub badge: String,
    pub age: u32,
    pub department: String,
    pub email: String,
    pub rating: u8,
}

impl IdentityInfo {
    /// A rating above 3 marks the identity authorized.
    pub fn is_authorized(&self) -> bool {
        self.rating > 3
    }
}

/// Identity info port. Lookups are best-effort: implementations log failures
/// and return `None`, they never surface errors into tracking logic.
pub trait IdentityDirectory {
    fn lookup(&self, identity: IdentityId) -> Option<IdentityInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_above_three_is_authorized() {
        let mut info = IdentityInfo {
            name: "A. Operator".into(),
            badge: "OP-1".into(),
            age: 34,
            department: "Ops".into(),
            email: "a@example.com".into(),
            rating: 4,
        };
        assert!(info.is_authorized());

        info.rating = 3;
        assert!(!info.is_authorized());
    }
}
