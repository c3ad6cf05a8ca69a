//! PII redaction.
//!
//! Rewrites report text so that no verbatim identifier leaves the trust
//! boundary: the extracted name becomes the patient token, the extracted
//! date-of-birth substring becomes a fixed sentinel. This stage is
//! fail-closed — on any fault the caller must abort before handing text
//! downstream, because an unredacted leak is unacceptable.

use regex::{NoExpand, Regex};

use crate::models::IdentityFields;

/// Sentinel substituted for the date-of-birth substring.
pub const DOB_SENTINEL: &str = "DOB_REDACTED";

#[derive(Debug, thiserror::Error)]
pub enum RedactError {
    #[error("failed to build redaction pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("redaction left a verbatim {field} in the output")]
    IncompleteRedaction { field: &'static str },
}

/// Replace every occurrence of `needle` with `replacement`, both treated
/// as literal text. Structural regex characters in the needle are escaped
/// and the replacement is never expanded.
fn replace_literal(text: &str, needle: &str, replacement: &str) -> Result<String, RedactError> {
    let pattern = Regex::new(&regex::escape(needle))?;
    Ok(pattern.replace_all(text, NoExpand(replacement)).into_owned())
}

/// Produce the sanitized text for a report.
///
/// The extracted name (if any) is replaced everywhere by the patient
/// token; the raw matched date-of-birth substring (if any) is replaced
/// everywhere by [`DOB_SENTINEL`]. The output is verified to contain
/// neither identifier before it is returned.
pub fn scrub(
    text: &str,
    identity: &IdentityFields,
    patient_token: &str,
) -> Result<String, RedactError> {
    let mut sanitized = text.to_string();

    if let Some(name) = identity.name.as_deref() {
        sanitized = replace_literal(&sanitized, name, patient_token)?;
        if sanitized.contains(name) {
            return Err(RedactError::IncompleteRedaction { field: "name" });
        }
    }

    if let Some(dob) = &identity.dob {
        sanitized = sanitized.replace(&dob.raw, DOB_SENTINEL);
        if sanitized.contains(&dob.raw) {
            return Err(RedactError::IncompleteRedaction {
                field: "date of birth",
            });
        }
    }

    Ok(sanitized)
}

/// Swap the locally derived token for a vault-issued one.
///
/// Used by the optional secondary tokenization path: after a successful
/// vault call the name positions (already holding the local token) are
/// rewritten to carry the vault token instead. The local token remains the
/// record key regardless.
pub fn substitute_vault_token(
    sanitized: &str,
    local_token: &str,
    vault_token: &str,
) -> Result<String, RedactError> {
    replace_literal(sanitized, local_token, vault_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DobMatch;
    use crate::pipeline::identity::extract_identity;

    const TOKEN: &str = "PT_0123456789abcdef01234567";

    #[test]
    fn name_replaced_everywhere() {
        let text = "Patient Name: John Smith\nSigned: John Smith";
        let identity = extract_identity(text);
        let sanitized = scrub(text, &identity, TOKEN).unwrap();
        assert!(!sanitized.contains("John Smith"));
        assert_eq!(sanitized.matches(TOKEN).count(), 2);
    }

    #[test]
    fn dob_raw_substring_replaced_with_sentinel() {
        let text = "Patient Name: John Smith\nDOB: 01/02/1990\nVitamin D: 20 ng/mL LOW";
        let identity = extract_identity(text);
        let sanitized = scrub(text, &identity, TOKEN).unwrap();
        assert!(!sanitized.contains("John Smith"));
        assert!(!sanitized.contains("01/02/1990"));
        assert!(sanitized.contains(DOB_SENTINEL));
        assert!(sanitized.contains("Vitamin D: 20 ng/mL LOW"));
    }

    #[test]
    fn name_with_regex_metacharacters_is_literal() {
        // Apostrophes and hyphens survive extraction; the escape must keep
        // them literal rather than treating them as pattern syntax.
        let text = "Patient Name: Mary O'Brien-Smith\nNotes for Mary O'Brien-Smith follow.";
        let identity = extract_identity(text);
        let sanitized = scrub(text, &identity, TOKEN).unwrap();
        assert!(!sanitized.contains("O'Brien-Smith"));
        assert_eq!(sanitized.matches(TOKEN).count(), 2);
    }

    #[test]
    fn missing_fields_leave_text_unchanged() {
        let text = "Vitamin D: 20 ng/mL LOW";
        let sanitized = scrub(text, &IdentityFields::default(), TOKEN).unwrap();
        assert_eq!(sanitized, text);
    }

    #[test]
    fn unnormalized_dob_still_redacted() {
        let identity = IdentityFields {
            name: None,
            dob: Some(DobMatch {
                raw: "13/32/1990".into(),
                iso: None,
            }),
        };
        let sanitized = scrub("DOB: 13/32/1990", &identity, TOKEN).unwrap();
        assert_eq!(sanitized, format!("DOB: {DOB_SENTINEL}"));
    }

    #[test]
    fn vault_token_substitution_is_literal() {
        let sanitized = format!("report for {TOKEN} done");
        let swapped = substitute_vault_token(&sanitized, TOKEN, "tok_$vault$1").unwrap();
        assert_eq!(swapped, "report for tok_$vault$1 done");
    }
}
