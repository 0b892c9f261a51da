//! SQLite-backed attendance ledger and identity directory.
//!
//! A session is one `attendance` row: open rows have `ended_at` NULL, and
//! the row id doubles as the session handle. Identity rows carry the
//! descriptive attributes shown at arrival and in CLI listings.

use chrono::{DateTime, Utc};
use roster_core::{
    AttendanceLedger, IdentityDirectory, IdentityId, IdentityInfo, LedgerError, SessionHandle,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use thiserror::Error;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS identity (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    badge       TEXT NOT NULL,
    age         INTEGER NOT NULL,
    department  TEXT NOT NULL,
    email       TEXT NOT NULL,
    rating      INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS attendance (
    id          INTEGER PRIMARY KEY,
    identity_id INTEGER NOT NULL REFERENCES identity (id),
    started_at  TEXT NOT NULL,
    ended_at    TEXT
);

CREATE INDEX IF NOT EXISTS idx_attendance_open
    ON attendance (identity_id) WHERE ended_at IS NULL;
";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("failed to create data directory: {0}")]
    DataDir(#[from] std::io::Error),
}

/// A new identity row to insert; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub name: String,
    pub badge: String,
    pub age: u32,
    pub department: String,
    pub email: String,
    pub rating: u8,
}

/// One attendance session, joined with the identity's name when known.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session: SessionHandle,
    pub identity: IdentityId,
    pub name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Handle to the attendance database.
///
/// Connections are cheap; the daemon opens one per port so the ledger and
/// the directory never contend for a borrow.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert an identity row and return its assigned id.
    pub fn add_identity(&mut self, identity: &NewIdentity) -> Result<IdentityId, StoreError> {
        self.conn.execute(
            "INSERT INTO identity (name, badge, age, department, email, rating)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                identity.name,
                identity.badge,
                identity.age,
                identity.department,
                identity.email,
                identity.rating,
            ],
        )?;
        Ok(IdentityId(self.conn.last_insert_rowid()))
    }

    /// All identity rows, ascending by id.
    pub fn identities(&self) -> Result<Vec<(IdentityId, IdentityInfo)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, badge, age, department, email, rating
             FROM identity ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((IdentityId(row.get(0)?), Self::info_from_row(row, 1)?))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Recent sessions, newest first.
    pub fn sessions(&self, limit: Option<u32>) -> Result<Vec<SessionRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.identity_id, i.name, a.started_at, a.ended_at
             FROM attendance a LEFT JOIN identity i ON i.id = a.identity_id
             ORDER BY a.started_at DESC, a.id DESC
             LIMIT ?1",
        )?;
        let limit = limit.map(i64::from).unwrap_or(-1);
        let rows = stmt.query_map(params![limit], Self::session_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Sessions with no end timestamp: identities still considered present.
    pub fn open_sessions(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.identity_id, i.name, a.started_at, a.ended_at
             FROM attendance a LEFT JOIN identity i ON i.id = a.identity_id
             WHERE a.ended_at IS NULL
             ORDER BY a.started_at, a.id",
        )?;
        let rows = stmt.query_map([], Self::session_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
        Ok(SessionRecord {
            session: SessionHandle(row.get(0)?),
            identity: IdentityId(row.get(1)?),
            name: row.get(2)?,
            started_at: row.get(3)?,
            ended_at: row.get(4)?,
        })
    }

    fn info_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<IdentityInfo> {
        Ok(IdentityInfo {
            name: row.get(offset)?,
            badge: row.get(offset + 1)?,
            age: row.get(offset + 2)?,
            department: row.get(offset + 3)?,
            email: row.get(offset + 4)?,
            rating: row.get(offset + 5)?,
        })
    }

    fn lookup_info(&self, identity: IdentityId) -> Result<Option<IdentityInfo>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, badge, age, department, email, rating
             FROM identity WHERE id = ?1",
        )?;
        stmt.query_row(params![identity.0], |row| Self::info_from_row(row, 0))
            .optional()
            .map_err(StoreError::from)
    }
}

impl AttendanceLedger for Store {
    fn open(
        &mut self,
        identity: IdentityId,
        at: DateTime<Utc>,
    ) -> Result<SessionHandle, LedgerError> {
        self.conn
            .execute(
                "INSERT INTO attendance (identity_id, started_at) VALUES (?1, ?2)",
                params![identity.0, at],
            )
            .map_err(|e| LedgerError::new(format!("open session for identity {identity}: {e}")))?;
        Ok(SessionHandle(self.conn.last_insert_rowid()))
    }

    fn close(&mut self, handle: SessionHandle, at: DateTime<Utc>) -> Result<(), LedgerError> {
        let updated = self
            .conn
            .execute(
                "UPDATE attendance SET ended_at = ?1 WHERE id = ?2 AND ended_at IS NULL",
                params![at, handle.0],
            )
            .map_err(|e| LedgerError::new(format!("close session {}: {e}", handle.0)))?;
        if updated == 0 {
            return Err(LedgerError::new(format!(
                "no open session for handle {}",
                handle.0
            )));
        }
        Ok(())
    }
}

impl IdentityDirectory for Store {
    /// Best-effort: query failures are logged and reported as "no info" so
    /// they can never reach tracking logic.
    fn lookup(&self, identity: IdentityId) -> Option<IdentityInfo> {
        match self.lookup_info(identity) {
            Ok(info) => info,
            Err(error) => {
                tracing::warn!(identity = %identity, error = %error, "identity lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn sample_identity() -> NewIdentity {
        NewIdentity {
            name: "R. Vance".into(),
            badge: "E-1042".into(),
            age: 29,
            department: "Assembly".into(),
            email: "rvance@example.com".into(),
            rating: 4,
        }
    }

    #[test]
    fn test_open_close_session_roundtrip() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store.add_identity(&sample_identity()).unwrap();

        let handle = store.open(id, t(0)).unwrap();
        let open = store.open_sessions().unwrap();
        assert_eq!(open.len(), 1);
        assert!(open[0].is_open());
        assert_eq!(open[0].identity, id);
        assert_eq!(open[0].name.as_deref(), Some("R. Vance"));

        store.close(handle, t(60)).unwrap();
        assert!(store.open_sessions().unwrap().is_empty());

        let sessions = store.sessions(None).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].started_at, t(0));
        assert_eq!(sessions[0].ended_at, Some(t(60)));
    }

    #[test]
    fn test_close_without_open_is_an_error() {
        let mut store = Store::open_in_memory().unwrap();
        assert!(store.close(SessionHandle(99), t(0)).is_err());
    }

    #[test]
    fn test_double_close_is_an_error() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store.add_identity(&sample_identity()).unwrap();
        let handle = store.open(id, t(0)).unwrap();

        store.close(handle, t(10)).unwrap();
        assert!(store.close(handle, t(20)).is_err());
    }

    #[test]
    fn test_sessions_newest_first_with_limit() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store.add_identity(&sample_identity()).unwrap();
        for start in [0, 100, 200] {
            let handle = store.open(id, t(start)).unwrap();
            store.close(handle, t(start + 50)).unwrap();
        }

        let sessions = store.sessions(Some(2)).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].started_at, t(200));
        assert_eq!(sessions[1].started_at, t(100));
    }

    #[test]
    fn test_directory_lookup() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store.add_identity(&sample_identity()).unwrap();

        let info = store.lookup(id).unwrap();
        assert_eq!(info.name, "R. Vance");
        assert_eq!(info.rating, 4);
        assert!(info.is_authorized());

        assert!(store.lookup(IdentityId(9999)).is_none());
    }

    #[test]
    fn test_identities_listing() {
        let mut store = Store::open_in_memory().unwrap();
        store.add_identity(&sample_identity()).unwrap();
        let mut second = sample_identity();
        second.name = "M. Osei".into();
        second.rating = 1;
        store.add_identity(&second).unwrap();

        let identities = store.identities().unwrap();
        assert_eq!(identities.len(), 2);
        assert_eq!(identities[1].1.name, "M. Osei");
        assert!(!identities[1].1.is_authorized());
    }
}
