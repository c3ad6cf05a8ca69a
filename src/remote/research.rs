//! Research collaborator: fetches short advisory notes for abnormal
//! biomarker results from a web search API.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("cannot reach research service at {0}")]
    Connection(String),
    #[error("research service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("unusable research response: {0}")]
    ResponseParsing(String),
}

/// Research collaborator interface. Never surfaces an error to the end
/// caller — the pipeline substitutes an empty advisory list on failure.
pub trait ResearchClient: Send + Sync {
    fn advise(
        &self,
        biomarker: &str,
        value: f64,
        direction: &str,
    ) -> Result<Vec<String>, ResearchError>;
}

/// HTTP client for a search-style research API. When no API key is
/// configured the call short-circuits to a placeholder advisory rather
/// than failing, so an unconfigured deployment still completes.
pub struct HttpResearchClient {
    base_url: String,
    api_key: Option<String>,
    num_results: u32,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    num_results: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

impl HttpResearchClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            num_results: 2,
            client,
        }
    }
}

impl ResearchClient for HttpResearchClient {
    fn advise(
        &self,
        biomarker: &str,
        _value: f64,
        direction: &str,
    ) -> Result<Vec<String>, ResearchError> {
        let Some(api_key) = &self.api_key else {
            return Ok(vec![
                "Research API key missing - skipping live search.".to_string(),
            ]);
        };

        tracing::debug!(biomarker, direction, "querying research service");
        let query = format!(
            "latest clinical guidelines for {direction} {biomarker} treatment lifestyle"
        );
        let url = format!("{}/v1/search", self.base_url);
        let body = SearchRequest {
            query: &query,
            num_results: self.num_results,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ResearchError::Connection(self.base_url.clone())
                } else {
                    ResearchError::ResponseParsing(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ResearchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .map_err(|e| ResearchError::ResponseParsing(e.to_string()))?;

        Ok(parsed
            .results
            .into_iter()
            .map(|r| {
                if r.snippet.is_empty() {
                    r.title
                } else {
                    format!("{}: {}", r.title, r.snippet)
                }
            })
            .collect())
    }
}

/// Mock client for tests.
#[cfg(test)]
pub struct MockResearchClient {
    pub notes: Vec<String>,
    pub fail: bool,
}

#[cfg(test)]
impl ResearchClient for MockResearchClient {
    fn advise(&self, _: &str, _: f64, _: &str) -> Result<Vec<String>, ResearchError> {
        if self.fail {
            Err(ResearchError::Connection("mock".into()))
        } else {
            Ok(self.notes.clone())
        }
    }
}
