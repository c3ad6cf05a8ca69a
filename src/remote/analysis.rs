//! Analysis collaborator: turns sanitized report text into structured
//! biomarkers via a messages-style LLM API.

use serde::{Deserialize, Serialize};

use crate::models::{AnalysisResult, Biomarker};

/// System prompt for the analysis model. It only ever sees redacted text.
const SYSTEM_PROMPT: &str = "\
You are a medical analysis agent. You receive REDACTED text.
1. EXTRACT: Convert blood work text into JSON: {\"biomarkers\": [{\"name\": \"Vitamin D\", \"value\": 20, \"unit\": \"ng/mL\", \"flag\": \"LOW\"}]}
2. TREND: If PREVIOUS_DATA is provided, compare values.
OUTPUT VALID JSON ONLY.";

const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1500;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("no analysis endpoint configured")]
    NotConfigured,
    #[error("cannot reach analysis service at {0}")]
    Connection(String),
    #[error("analysis service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("unusable analysis response: {0}")]
    ResponseParsing(String),
}

/// Analysis collaborator interface.
pub trait AnalysisClient: Send + Sync {
    /// Analyze sanitized text, optionally with the previous report's
    /// biomarkers serialized as context.
    fn analyze(
        &self,
        sanitized_text: &str,
        previous_biomarkers: Option<&str>,
    ) -> Result<AnalysisResult, AnalysisError>;
}

/// The documented degraded value substituted when analysis fails: a fixed
/// mock biomarker list, so the pipeline always completes.
pub fn fallback_biomarkers() -> Vec<Biomarker> {
    vec![
        Biomarker {
            name: "Vitamin D".into(),
            value: 20.0,
            unit: "ng/mL".into(),
            flag: "LOW".into(),
            research_notes: None,
        },
        Biomarker {
            name: "Ferritin".into(),
            value: 15.0,
            unit: "ng/mL".into(),
            flag: "LOW".into(),
            research_notes: None,
        },
    ]
}

/// HTTP client for a messages-style analysis API.
pub struct HttpAnalysisClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl HttpAnalysisClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

impl AnalysisClient for HttpAnalysisClient {
    fn analyze(
        &self,
        sanitized_text: &str,
        previous_biomarkers: Option<&str>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let context = match previous_biomarkers {
            Some(json) => format!("PREVIOUS_DATA: {json}"),
            None => "PREVIOUS_DATA: None".to_string(),
        };
        let content = format!("{sanitized_text}\n\n{context}");

        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: &content,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    AnalysisError::Connection(self.base_url.clone())
                } else {
                    AnalysisError::ResponseParsing(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .map_err(|e| AnalysisError::ResponseParsing(e.to_string()))?;
        let text = parsed
            .content
            .first()
            .map(|block| block.text.as_str())
            .ok_or_else(|| AnalysisError::ResponseParsing("empty content".into()))?;

        serde_json::from_str(text).map_err(|e| AnalysisError::ResponseParsing(e.to_string()))
    }
}

/// Stand-in when no analysis endpoint is configured. Always fails, which
/// routes the pipeline to the fallback biomarkers.
pub struct DisabledAnalysisClient;

impl AnalysisClient for DisabledAnalysisClient {
    fn analyze(&self, _: &str, _: Option<&str>) -> Result<AnalysisResult, AnalysisError> {
        Err(AnalysisError::NotConfigured)
    }
}

/// Mock client for tests: returns a configured result and records the
/// context it was called with.
#[cfg(test)]
pub struct MockAnalysisClient {
    result: AnalysisResult,
    pub seen_previous: std::sync::Mutex<Option<Option<String>>>,
    pub seen_text: std::sync::Mutex<Option<String>>,
}

#[cfg(test)]
impl MockAnalysisClient {
    pub fn new(biomarkers: Vec<Biomarker>) -> Self {
        Self {
            result: AnalysisResult { biomarkers },
            seen_previous: std::sync::Mutex::new(None),
            seen_text: std::sync::Mutex::new(None),
        }
    }
}

#[cfg(test)]
impl AnalysisClient for MockAnalysisClient {
    fn analyze(
        &self,
        sanitized_text: &str,
        previous_biomarkers: Option<&str>,
    ) -> Result<AnalysisResult, AnalysisError> {
        *self.seen_text.lock().unwrap() = Some(sanitized_text.to_string());
        *self.seen_previous.lock().unwrap() = Some(previous_biomarkers.map(str::to_string));
        Ok(self.result.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_fixed_and_abnormal() {
        let markers = fallback_biomarkers();
        assert_eq!(markers.len(), 2);
        assert!(markers.iter().all(|m| m.is_abnormal()));
        assert_eq!(markers[0].name, "Vitamin D");
    }

    #[test]
    fn disabled_client_reports_not_configured() {
        let err = DisabledAnalysisClient.analyze("text", None).unwrap_err();
        assert!(matches!(err, AnalysisError::NotConfigured));
    }

    #[test]
    fn http_client_trims_trailing_slash() {
        let client = HttpAnalysisClient::new("https://api.example.com/", "key", "model-x", 30);
        assert_eq!(client.base_url, "https://api.example.com");
    }

    #[test]
    fn mock_records_previous_context() {
        let mock = MockAnalysisClient::new(vec![]);
        mock.analyze("sanitized", Some("[{\"name\":\"Ferritin\"}]"))
            .unwrap();
        let seen = mock.seen_previous.lock().unwrap().clone().unwrap();
        assert_eq!(seen.as_deref(), Some("[{\"name\":\"Ferritin\"}]"));
    }
}
