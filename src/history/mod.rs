//! Append-only patient history, keyed by patient token.
//!
//! One key per token, value = the JSON-serialized ordered list of entries.
//! Ordering is append order, not lab-date order — callers wanting
//! chronology sort explicitly. Nothing is ever deleted or edited in place.
//!
//! Every call returns an explicit `Result`; the degrade-on-failure policy
//! (empty history on failed reads, skipped persistence on failed appends)
//! lives in the pipeline processor, keeping it auditable in one place.

pub mod sqlite;

use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::HistoryEntry;

pub use sqlite::SqliteHistoryStore;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history store unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("corrupt history payload for token {token}: {reason}")]
    Corrupt { token: String, reason: String },
}

/// Backing store for per-patient report history.
pub trait HistoryStore: Send + Sync {
    /// All entries for the token in append order. Unknown tokens yield an
    /// empty list, not an error.
    fn read_all(&self, patient_token: &str) -> Result<Vec<HistoryEntry>, HistoryError>;

    /// Append one entry at the end of the token's history, writing the
    /// full list back as one unit.
    fn append(&self, patient_token: &str, entry: HistoryEntry) -> Result<(), HistoryError>;
}

/// In-memory store, used in tests and anywhere a throwaway store is fine.
#[derive(Default)]
pub struct MemoryHistoryStore {
    entries: Mutex<HashMap<String, Vec<HistoryEntry>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn read_all(&self, patient_token: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| HistoryError::Unavailable("lock poisoned".into()))?;
        Ok(entries.get(patient_token).cloned().unwrap_or_default())
    }

    fn append(&self, patient_token: &str, entry: HistoryEntry) -> Result<(), HistoryError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| HistoryError::Unavailable("lock poisoned".into()))?;
        entries
            .entry(patient_token.to_string())
            .or_default()
            .push(entry);
        Ok(())
    }
}

/// Stand-in used when the backing database could not be opened at startup.
/// Every call fails, and the pipeline degrades per its documented policy
/// instead of the process refusing to serve.
pub struct UnavailableHistoryStore;

impl HistoryStore for UnavailableHistoryStore {
    fn read_all(&self, _patient_token: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        Err(HistoryError::Unavailable(
            "backing database was not opened".into(),
        ))
    }

    fn append(&self, _patient_token: &str, _entry: HistoryEntry) -> Result<(), HistoryError> {
        Err(HistoryError::Unavailable(
            "backing database was not opened".into(),
        ))
    }
}

#[cfg(test)]
pub(crate) fn sample_entry(lab_date: &str) -> HistoryEntry {
    use chrono::{NaiveDate, Utc};

    HistoryEntry {
        lab_date: lab_date.parse::<NaiveDate>().unwrap(),
        uploaded_at: Utc::now(),
        original_filename: "report.pdf".into(),
        file_url: "/files/stored-report.pdf".into(),
        biomarkers: vec![],
    }
}
