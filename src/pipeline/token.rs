//! Pseudonymous patient token derivation.
//!
//! A patient token is a keyed hash of the extracted (name, date-of-birth)
//! pair. The same pair with the same salt always yields the same token, so
//! repeat uploads link to the same history without the clear identity ever
//! being stored.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::models::IdentityFields;

type HmacSha256 = Hmac<Sha256>;

/// Constant tag prepended to every patient token.
pub const TOKEN_PREFIX: &str = "PT_";
/// Hex digits of the HMAC digest kept in the token.
const TOKEN_HEX_LEN: usize = 24;
/// Separator between name and date of birth in the composite key. Not
/// expected to occur inside either field.
const FIELD_SEPARATOR: char = '|';

/// Derive the patient token for a set of identity fields.
///
/// When neither field was extracted the basis is a fresh random value:
/// unidentifiable reports get no cross-upload linkage. That is a privacy
/// stance, not an accident — no PII, no linkage.
pub fn derive_patient_token(identity: &IdentityFields, salt: &str) -> String {
    let name = identity.name.as_deref().unwrap_or("");
    let dob = identity
        .dob
        .as_ref()
        .map(|d| d.token_value())
        .unwrap_or_default();

    let basis = if name.trim().is_empty() && dob.trim().is_empty() {
        Uuid::new_v4().to_string()
    } else {
        format!("{name}{FIELD_SEPARATOR}{dob}")
    };

    let mut mac = HmacSha256::new_from_slice(salt.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(basis.as_bytes());
    let digest = mac.finalize().into_bytes();

    format!("{TOKEN_PREFIX}{}", &hex::encode(digest)[..TOKEN_HEX_LEN])
}
