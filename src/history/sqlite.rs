//! SQLite-backed history store.
//!
//! A single key/value table: one row per patient token, the value being
//! the JSON-serialized entry list. The append is a read-modify-write
//! inside one transaction under the connection lock, so concurrent
//! in-process appends for the same token serialize instead of racing.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension};

use super::{HistoryError, HistoryStore};
use crate::models::HistoryEntry;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS patient_history (
    patient_token TEXT PRIMARY KEY,
    entries       TEXT NOT NULL
)";

pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Open (or create) the history database at the given path.
    ///
    /// `busy_timeout` bounds how long a call may block on a locked
    /// database before it degrades, per the best-effort persistence
    /// contract.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, HistoryError> {
        let conn = Connection::open(path)?;
        Self::initialize(conn, busy_timeout)
    }

    /// In-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, HistoryError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn, Duration::from_millis(250))
    }

    fn initialize(conn: Connection, busy_timeout: Duration) -> Result<Self, HistoryError> {
        conn.busy_timeout(busy_timeout)?;
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn read_entries(
        conn: &Connection,
        patient_token: &str,
    ) -> Result<Vec<HistoryEntry>, HistoryError> {
        let payload: Option<String> = conn
            .query_row(
                "SELECT entries FROM patient_history WHERE patient_token = ?1",
                [patient_token],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            None => Ok(Vec::new()),
            Some(json) => serde_json::from_str(&json).map_err(|e| HistoryError::Corrupt {
                token: patient_token.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn read_all(&self, patient_token: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| HistoryError::Unavailable("lock poisoned".into()))?;
        Self::read_entries(&conn, patient_token)
    }

    fn append(&self, patient_token: &str, entry: HistoryEntry) -> Result<(), HistoryError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| HistoryError::Unavailable("lock poisoned".into()))?;
        let tx = conn.transaction()?;

        let mut entries = Self::read_entries(&tx, patient_token)?;
        entries.push(entry);
        let payload = serde_json::to_string(&entries).map_err(|e| HistoryError::Corrupt {
            token: patient_token.to_string(),
            reason: e.to_string(),
        })?;

        tx.execute(
            "INSERT INTO patient_history (patient_token, entries) VALUES (?1, ?2)
             ON CONFLICT(patient_token) DO UPDATE SET entries = excluded.entries",
            [patient_token, &payload],
        )?;
        tx.commit()?;
        Ok(())
    }
}
