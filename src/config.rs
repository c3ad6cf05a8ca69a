//! Runtime configuration, read once from the environment at startup.
//!
//! Every setting has a workable default so the service runs locally with
//! no configuration at all: analysis degrades to fallback biomarkers,
//! research returns its placeholder note, and the vault stays disabled.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::remote::VaultSchema;

const DEFAULT_BIND: &str = "127.0.0.1:8000";
const DEFAULT_TOKEN_SALT: &str = "labtrail-dev-salt";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_ANALYSIS_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_ANALYSIS_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_RESEARCH_BASE_URL: &str = "https://api.exa.ai";
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid bind address {value:?}: {reason}")]
    InvalidBindAddr { value: String, reason: String },
    #[error("could not determine a home directory for the data dir")]
    NoDataDir,
}

/// Vault settings; present only when both endpoint and key are configured.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub records_url: String,
    pub api_key: String,
    pub schema: VaultSchema,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub token_salt: String,
    pub cors_origin: String,
    pub remote_timeout_secs: u64,
    pub analysis_base_url: String,
    pub analysis_model: String,
    pub analysis_api_key: Option<String>,
    pub research_base_url: String,
    pub research_api_key: Option<String>,
    pub vault: Option<VaultConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind = get("LABTRAIL_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidBindAddr {
                value: bind.clone(),
                reason: e.to_string(),
            })?;

        let data_dir = match get("LABTRAIL_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .ok_or(ConfigError::NoDataDir)?
                .join("labtrail"),
        };

        let vault = match (get("VAULT_RECORDS_URL"), get("VAULT_API_KEY")) {
            (Some(records_url), Some(api_key)) => {
                let defaults = VaultSchema::default();
                Some(VaultConfig {
                    records_url,
                    api_key,
                    schema: VaultSchema {
                        table: get("VAULT_TABLE").unwrap_or(defaults.table),
                        name_field: get("VAULT_NAME_FIELD").unwrap_or(defaults.name_field),
                        dob_field: get("VAULT_DOB_FIELD").unwrap_or(defaults.dob_field),
                        base64_fields: defaults.base64_fields,
                    },
                })
            }
            _ => None,
        };

        Ok(Self {
            bind_addr,
            data_dir,
            token_salt: get("PATIENT_TOKEN_SALT").unwrap_or_else(|| DEFAULT_TOKEN_SALT.to_string()),
            cors_origin: get("LABTRAIL_CORS_ORIGIN")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            remote_timeout_secs: get("REMOTE_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_REMOTE_TIMEOUT_SECS),
            analysis_base_url: get("ANALYSIS_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ANALYSIS_BASE_URL.to_string()),
            analysis_model: get("ANALYSIS_MODEL")
                .unwrap_or_else(|| DEFAULT_ANALYSIS_MODEL.to_string()),
            analysis_api_key: get("ANALYSIS_API_KEY").filter(|k| !k.is_empty()),
            research_base_url: get("RESEARCH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_RESEARCH_BASE_URL.to_string()),
            research_api_key: get("RESEARCH_API_KEY").filter(|k| !k.is_empty()),
            vault,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("history.db")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "labtrail=info,tower_http=info"
}
