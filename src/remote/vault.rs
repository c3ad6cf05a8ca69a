//! Optional secondary tokenization vault.
//!
//! When configured, the extracted (name, dob) pair is inserted into an
//! external vault which returns field-level tokens. The vault path is
//! strictly best-effort: any failure is a no-op and the locally derived
//! patient token remains both the record key and the redaction value.

use serde_json::{json, Value};

use base64::Engine;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("cannot reach vault at {0}")]
    Connection(String),
    #[error("vault returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("unusable vault response: {0}")]
    ResponseParsing(String),
}

/// Field-level tokens issued by the vault.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultTokens {
    pub name_token: Option<String>,
    pub dob_token: Option<String>,
}

/// Vault interface: one record insertion with tokenization.
pub trait VaultClient: Send + Sync {
    fn tokenize(&self, name: &str, dob: &str) -> Result<VaultTokens, VaultError>;
}

/// Table and field names the vault stores records under.
#[derive(Debug, Clone)]
pub struct VaultSchema {
    pub table: String,
    pub name_field: String,
    pub dob_field: String,
    /// Some vaults require base64-encoded field values.
    pub base64_fields: bool,
}

impl Default for VaultSchema {
    fn default() -> Self {
        Self {
            table: "persons".into(),
            name_field: "name".into(),
            dob_field: "dob".into(),
            base64_fields: true,
        }
    }
}

pub struct HttpVaultClient {
    records_url: String,
    api_key: String,
    schema: VaultSchema,
    client: reqwest::blocking::Client,
}

impl HttpVaultClient {
    /// `records_url` is the full record-insertion endpoint of the vault.
    pub fn new(records_url: &str, api_key: &str, schema: VaultSchema, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            records_url: records_url.to_string(),
            api_key: api_key.to_string(),
            schema,
            client,
        }
    }

    fn encode(&self, value: &str) -> String {
        if value.is_empty() {
            String::new()
        } else if self.schema.base64_fields {
            base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
        } else {
            value.to_string()
        }
    }
}

impl VaultClient for HttpVaultClient {
    fn tokenize(&self, name: &str, dob: &str) -> Result<VaultTokens, VaultError> {
        let mut fields = serde_json::Map::new();
        fields.insert(
            self.schema.name_field.clone(),
            Value::String(self.encode(name)),
        );
        fields.insert(
            self.schema.dob_field.clone(),
            Value::String(self.encode(dob)),
        );
        let payload = json!({
            "records": [{
                "table": self.schema.table,
                "fields": fields,
            }],
            "tokens": true,
        });

        let response = self
            .client
            .post(&self.records_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    VaultError::Connection(self.records_url.clone())
                } else {
                    VaultError::ResponseParsing(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(VaultError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = response
            .json()
            .map_err(|e| VaultError::ResponseParsing(e.to_string()))?;
        let tokens = &parsed["records"][0]["tokens"];

        Ok(VaultTokens {
            name_token: tokens[self.schema.name_field.as_str()]
                .as_str()
                .map(str::to_string),
            dob_token: tokens[self.schema.dob_field.as_str()]
                .as_str()
                .map(str::to_string),
        })
    }
}

/// Mock vault for tests.
#[cfg(test)]
pub struct MockVaultClient {
    pub tokens: VaultTokens,
    pub fail: bool,
}

#[cfg(test)]
impl VaultClient for MockVaultClient {
    fn tokenize(&self, _: &str, _: &str) -> Result<VaultTokens, VaultError> {
        if self.fail {
            Err(VaultError::Connection("mock".into()))
        } else {
            Ok(self.tokens.clone())
        }
    }
}
