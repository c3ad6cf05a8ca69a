//! Input-side types: the raw document handed over by ingestion, and the
//! identity fields extracted from it.

use chrono::{DateTime, NaiveDate, Utc};

/// One uploaded report, after text extraction. Immutable once produced.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Full extracted text. May be empty for image-only sources — that is
    /// valid input, not an error.
    pub text: String,
    /// Filename as supplied by the uploader, before storage renaming.
    pub original_filename: String,
    /// Server-side receipt time.
    pub uploaded_at: DateTime<Utc>,
}

/// A matched date-of-birth substring.
///
/// `raw` is the exact substring found in the text and is what redaction
/// removes; `iso` is the normalized calendar date when the substring could
/// be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DobMatch {
    pub raw: String,
    pub iso: Option<NaiveDate>,
}

impl DobMatch {
    /// Value used for token derivation: the ISO form when available,
    /// otherwise the raw matched substring.
    pub fn token_value(&self) -> String {
        match self.iso {
            Some(date) => date.to_string(),
            None => self.raw.clone(),
        }
    }
}

/// Direct identifiers located in a report. Either field may be absent;
/// absence is an expected outcome of best-effort pattern matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityFields {
    pub name: Option<String>,
    pub dob: Option<DobMatch>,
}

impl IdentityFields {
    /// True when no direct identifier was found at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.dob.is_none()
    }
}
