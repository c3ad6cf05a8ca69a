//! Direct-identifier extraction from report text.
//!
//! Best-effort pattern matching for the patient's display name and date of
//! birth. A miss is an expected outcome, never an error — downstream stages
//! carry the absence through their own fallbacks.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{DobMatch, IdentityFields};
use crate::pipeline::dates::parse_date_string;

// Labels are matched case-insensitively; the captured name itself must be
// two capitalized tokens (letters, apostrophes, hyphens).
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:patient\s+name|name)\s*[:\-]?\s*([A-Z][A-Za-z'\-]+\s+[A-Z][A-Za-z'\-]+)")
        .unwrap()
});

// Date of birth: long textual form ("March 5, 1990") or numeric form with
// `/` or `-` separators and a 2-or-4-digit year.
static DOB_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i:dob|date\s+of\s+birth)\s*[:\-]?\s*([A-Za-z]{3,9}\s+\d{1,2},\s+\d{4}|\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4})",
    )
    .unwrap()
});

/// Locate the patient name in the text. First match wins.
pub fn extract_name(text: &str) -> Option<String> {
    NAME_PATTERN
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
}

/// Locate the date of birth in the text. The raw matched substring is
/// always kept; normalization to a calendar date is attempted on top.
pub fn extract_dob(text: &str) -> Option<DobMatch> {
    DOB_PATTERN.captures(text).map(|caps| {
        let raw = caps[1].to_string();
        let iso = parse_date_string(&raw);
        DobMatch { raw, iso }
    })
}

/// Extract all direct identifiers from a report. Either field may be
/// absent; empty text yields an empty result.
pub fn extract_identity(text: &str) -> IdentityFields {
    IdentityFields {
        name: extract_name(text),
        dob: extract_dob(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn name_with_patient_name_label() {
        let text = "Patient Name: John Smith\nDOB: 01/02/1990";
        assert_eq!(extract_name(text), Some("John Smith".into()));
    }

    #[test]
    fn name_with_bare_name_label_and_dash() {
        assert_eq!(
            extract_name("name - Jane Doe\nOther: stuff"),
            Some("Jane Doe".into())
        );
    }

    #[test]
    fn name_allows_apostrophes_and_hyphens() {
        assert_eq!(
            extract_name("Patient Name: Mary O'Brien-Smith"),
            Some("Mary O'Brien-Smith".into())
        );
    }

    #[test]
    fn name_requires_capitalized_tokens() {
        assert_eq!(extract_name("Name: john smith"), None);
    }

    #[test]
    fn first_name_match_wins() {
        let text = "Patient Name: John Smith\nName: Jane Doe";
        assert_eq!(extract_name(text), Some("John Smith".into()));
    }

    #[test]
    fn name_absent_is_none() {
        assert_eq!(extract_name("Collection Date: 2024-03-05"), None);
        assert_eq!(extract_name(""), None);
    }

    #[test]
    fn dob_numeric_form_is_normalized() {
        let dob = extract_dob("DOB: 01/02/1990").unwrap();
        assert_eq!(dob.raw, "01/02/1990");
        assert_eq!(dob.iso, NaiveDate::from_ymd_opt(1990, 1, 2));
    }

    #[test]
    fn dob_textual_form_is_normalized() {
        let dob = extract_dob("Date of Birth: March 5, 1990").unwrap();
        assert_eq!(dob.raw, "March 5, 1990");
        assert_eq!(dob.iso, NaiveDate::from_ymd_opt(1990, 3, 5));
    }

    #[test]
    fn dob_keeps_raw_when_normalization_fails() {
        // Matches the numeric shape but is no valid calendar date under
        // any accepted format, so only the raw substring is kept.
        let dob = extract_dob("DOB: 13/32/1990").unwrap();
        assert_eq!(dob.raw, "13/32/1990");
        assert_eq!(dob.iso, None);
    }

    #[test]
    fn dob_absent_is_none() {
        assert_eq!(extract_dob("Patient Name: John Smith"), None);
    }

    #[test]
    fn both_fields_extracted_independently() {
        let identity = extract_identity("Patient Name: John Smith\nDOB: 01/02/1990");
        assert_eq!(identity.name, Some("John Smith".into()));
        assert_eq!(identity.dob.unwrap().raw, "01/02/1990");

        let identity = extract_identity("DOB: 01/02/1990");
        assert!(identity.name.is_none());
        assert!(identity.dob.is_some());
    }

    #[test]
    fn empty_text_yields_empty_identity() {
        assert!(extract_identity("").is_empty());
    }
}
