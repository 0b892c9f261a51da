//! Presence state machine: per-identity last-seen timers and attendance
//! session bookkeeping.
//!
//! Each identity is either absent (no record) or present (record held).
//! Sightings create or refresh records; a tick sweeps out identities not
//! seen within the timeout and closes their ledger sessions. Successful
//! ledger calls per identity strictly alternate open, close, open, close.

use crate::ports::{AttendanceLedger, LedgerError, SessionHandle};
use crate::types::IdentityId;
use chrono::{DateTime, Duration, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Outcome of a successful sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// First sighting after absence: a session was opened.
    Arrived,
    /// Already present: only the last-seen timestamp moved.
    Refreshed,
}

/// One identity that timed out of presence during a tick.
#[derive(Debug)]
pub struct Departure {
    pub identity: IdentityId,
    /// Set when the ledger close failed. The record is discarded regardless,
    /// leaving a stale open row in the ledger for the caller to report.
    pub ledger_error: Option<LedgerError>,
}

#[derive(Debug)]
struct PresenceRecord {
    last_seen: DateTime<Utc>,
    /// `None` only while a ledger open has failed and not yet been retried.
    session: Option<SessionHandle>,
}

/// Tracks which identities are currently present and drives the attendance
/// ledger around arrivals and departures.
///
/// Single-writer: one instance owns all presence records and must only be
/// mutated from one thread at a time. Ledger failure policy: a failed open
/// keeps the identity present without a handle and is retried on the next
/// sighting; a failed close still discards the record. Either way the
/// in-memory view and the ledger may diverge until the next successful
/// write, and every failure is returned to the caller.
#[derive(Debug)]
pub struct PresenceTracker {
    timeout: Duration,
    records: HashMap<IdentityId, PresenceRecord>,
}

impl PresenceTracker {
    /// Default seconds after the last sighting before an identity is
    /// considered to have left.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            records: HashMap::new(),
        }
    }

    /// Record a sighting of `identity` at `now`.
    ///
    /// An absent identity becomes present and a ledger session is opened for
    /// it. A present identity only has its last-seen timestamp refreshed;
    /// repeated sightings never open a second session. On `Err` the identity
    /// is still tracked as present and the open is retried on its next
    /// sighting.
    pub fn on_seen<L>(
        &mut self,
        ledger: &mut L,
        identity: IdentityId,
        now: DateTime<Utc>,
    ) -> Result<Presence, LedgerError>
    where
        L: AttendanceLedger + ?Sized,
    {
        match self.records.entry(identity) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                record.last_seen = now;
                if record.session.is_none() {
                    // An earlier open failed; catch the ledger up.
                    record.session = Some(ledger.open(identity, now)?);
                }
                Ok(Presence::Refreshed)
            }
            Entry::Vacant(vacant) => match ledger.open(identity, now) {
                Ok(handle) => {
                    vacant.insert(PresenceRecord {
                        last_seen: now,
                        session: Some(handle),
                    });
                    Ok(Presence::Arrived)
                }
                Err(error) => {
                    vacant.insert(PresenceRecord {
                        last_seen: now,
                        session: None,
                    });
                    Err(error)
                }
            },
        }
    }

    /// Sweep out every identity not seen for longer than the timeout,
    /// closing its ledger session.
    ///
    /// Invoked once per processed frame whether or not that frame had
    /// detections, so missed frames still advance departures. The timeout
    /// comparison is strict: an identity last seen exactly `timeout` ago
    /// remains present.
    pub fn on_tick<L>(&mut self, ledger: &mut L, now: DateTime<Utc>) -> Vec<Departure>
    where
        L: AttendanceLedger + ?Sized,
    {
        let mut expired: Vec<IdentityId> = self
            .records
            .iter()
            .filter(|(_, record)| now - record.last_seen > self.timeout)
            .map(|(identity, _)| *identity)
            .collect();
        expired.sort();

        let mut departures = Vec::with_capacity(expired.len());
        for identity in expired {
            let Some(record) = self.records.remove(&identity) else {
                continue;
            };
            let ledger_error = match record.session {
                Some(handle) => ledger.close(handle, now).err(),
                // The open never reached the ledger; nothing to close.
                None => None,
            };
            departures.push(Departure {
                identity,
                ledger_error,
            });
        }

        departures
    }

    pub fn is_present(&self, identity: IdentityId) -> bool {
        self.records.contains_key(&identity)
    }

    /// Identities currently considered present, in ascending order.
    pub fn present(&self) -> Vec<IdentityId> {
        let mut present: Vec<IdentityId> = self.records.keys().copied().collect();
        present.sort();
        present
    }

    pub fn present_count(&self) -> usize {
        self.records.len()
    }
}
