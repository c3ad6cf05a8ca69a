//! Persisted history entries, one per analyzed report.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Biomarker;

/// One report's resolved date, provenance and biomarker results.
/// Immutable once appended to a patient's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub lab_date: NaiveDate,
    pub uploaded_at: DateTime<Utc>,
    pub original_filename: String,
    /// Relative URL under which the stored upload can be fetched back.
    pub file_url: String,
    pub biomarkers: Vec<Biomarker>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let entry = HistoryEntry {
            lab_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            uploaded_at: Utc::now(),
            original_filename: "report.pdf".into(),
            file_url: "/files/abc.pdf".into(),
            biomarkers: vec![],
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: HistoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
        assert!(json.contains("\"2024-03-05\""));
    }
}
