//! Pipeline orchestrator: one uploaded document in, one de-identified,
//! analyzed, persisted outcome out.
//!
//! Degrade-on-failure policy, in one place:
//! - redaction failure aborts the unit of work (fail closed, raw text
//!   must never travel further),
//! - vault failure keeps the locally derived token,
//! - history read failure analyzes without trend context,
//! - analysis failure substitutes the fixed fallback biomarkers,
//! - research failure leaves the biomarker without notes,
//! - history append failure returns the result unpersisted.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::history::HistoryStore;
use crate::models::{Biomarker, HistoryEntry, RawDocument};
use crate::pipeline::{dates, identity, redact, token};
use crate::remote::{AnalysisClient, ResearchClient, VaultClient};

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Redaction(#[from] redact::RedactError),
}

/// Result of one pipeline run, ready for the API layer to serialize.
#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    /// Pseudonymous record key. Responses expose the patient only as this.
    pub patient_token: String,
    pub lab_date: NaiveDate,
    pub biomarkers: Vec<Biomarker>,
    /// True when the analysis collaborator failed and the fixed fallback
    /// biomarkers were substituted.
    pub used_fallback: bool,
    /// True when the new entry could not be appended to history.
    pub unpersisted: bool,
}

pub struct ReportProcessor {
    analysis: Box<dyn AnalysisClient>,
    research: Box<dyn ResearchClient>,
    vault: Option<Box<dyn VaultClient>>,
    history: Arc<dyn HistoryStore>,
    token_salt: String,
}

impl ReportProcessor {
    pub fn new(
        analysis: Box<dyn AnalysisClient>,
        research: Box<dyn ResearchClient>,
        vault: Option<Box<dyn VaultClient>>,
        history: Arc<dyn HistoryStore>,
        token_salt: String,
    ) -> Self {
        Self {
            analysis,
            research,
            vault,
            history,
            token_salt,
        }
    }

    /// Run the full pipeline for one document. `file_url` is where the
    /// stored original can be fetched back from.
    pub fn process(
        &self,
        doc: &RawDocument,
        file_url: &str,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        let identity = identity::extract_identity(&doc.text);
        let patient_token = token::derive_patient_token(&identity, &self.token_salt);
        tracing::info!(%patient_token, filename = %doc.original_filename, "processing report");

        let mut sanitized = redact::scrub(&doc.text, &identity, &patient_token)?;
        sanitized = self.apply_vault(sanitized, &identity, &patient_token);

        let lab_date = dates::resolve_lab_date(&doc.text, &doc.original_filename, doc.uploaded_at);

        let previous = match self.history.read_all(&patient_token) {
            Ok(entries) => entries
                .last()
                .and_then(|entry| serde_json::to_string(&entry.biomarkers).ok()),
            Err(e) => {
                tracing::warn!(%patient_token, error = %e, "history read failed, analyzing without trend context");
                None
            }
        };

        let (mut biomarkers, used_fallback) =
            match self.analysis.analyze(&sanitized, previous.as_deref()) {
                Ok(result) => (result.biomarkers, false),
                Err(e) => {
                    tracing::warn!(error = %e, "analysis failed, substituting fallback biomarkers");
                    (crate::remote::analysis::fallback_biomarkers(), true)
                }
            };

        self.enrich(&mut biomarkers);

        let entry = HistoryEntry {
            lab_date,
            uploaded_at: doc.uploaded_at,
            original_filename: doc.original_filename.clone(),
            file_url: file_url.to_string(),
            biomarkers: biomarkers.clone(),
        };
        let unpersisted = match self.history.append(&patient_token, entry) {
            Ok(()) => false,
            Err(e) => {
                tracing::warn!(%patient_token, error = %e, "history append failed, returning result unpersisted");
                true
            }
        };

        Ok(ProcessingOutcome {
            patient_token,
            lab_date,
            biomarkers,
            used_fallback,
            unpersisted,
        })
    }

    /// Swap the local token in the sanitized text for a vault-issued name
    /// token, when a vault is configured and something was extracted.
    /// Best-effort: the local token stays the record key either way.
    fn apply_vault(
        &self,
        sanitized: String,
        identity: &crate::models::IdentityFields,
        patient_token: &str,
    ) -> String {
        let Some(vault) = &self.vault else {
            return sanitized;
        };
        if identity.is_empty() {
            return sanitized;
        }

        let name = identity.name.as_deref().unwrap_or("");
        let dob = identity
            .dob
            .as_ref()
            .map(|d| d.token_value())
            .unwrap_or_default();

        match vault.tokenize(name, &dob) {
            Ok(tokens) => match tokens.name_token {
                Some(vault_token) => {
                    match redact::substitute_vault_token(&sanitized, patient_token, &vault_token) {
                        Ok(swapped) => swapped,
                        Err(e) => {
                            tracing::warn!(error = %e, "vault token substitution failed, keeping local token");
                            sanitized
                        }
                    }
                }
                None => sanitized,
            },
            Err(e) => {
                tracing::warn!(error = %e, "vault tokenization failed, keeping local token");
                sanitized
            }
        }
    }

    /// Attach research notes to each abnormal biomarker. Failures skip the
    /// biomarker, they never abort the run.
    fn enrich(&self, biomarkers: &mut [Biomarker]) {
        for marker in biomarkers.iter_mut().filter(|m| m.is_abnormal()) {
            match self.research.advise(&marker.name, marker.value, &marker.flag) {
                Ok(notes) if !notes.is_empty() => marker.research_notes = Some(notes),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(biomarker = %marker.name, error = %e, "research lookup failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistoryStore;
    use crate::remote::analysis::MockAnalysisClient;
    use crate::remote::research::MockResearchClient;
    use crate::remote::vault::{MockVaultClient, VaultTokens};
    use crate::remote::DisabledAnalysisClient;
    use chrono::Utc;
    use std::sync::Arc;

    const SAMPLE_REPORT: &str = "Patient Name: John Smith\n\
        DOB: 01/02/1990\n\
        Collection Date: March 5, 2024\n\
        Vitamin D: 20 ng/mL LOW";

    fn doc(text: &str, filename: &str) -> RawDocument {
        RawDocument {
            text: text.to_string(),
            original_filename: filename.to_string(),
            uploaded_at: Utc::now(),
        }
    }

    fn marker(name: &str, value: f64, flag: &str) -> Biomarker {
        Biomarker {
            name: name.into(),
            value,
            unit: "ng/mL".into(),
            flag: flag.into(),
            research_notes: None,
        }
    }

    fn processor(
        analysis: Box<dyn AnalysisClient>,
        research: Box<dyn ResearchClient>,
        vault: Option<Box<dyn VaultClient>>,
        history: Arc<dyn HistoryStore>,
    ) -> ReportProcessor {
        ReportProcessor::new(analysis, research, vault, history, "test-salt".into())
    }

    #[test]
    fn full_run_redacts_analyzes_and_persists() {
        let analysis = MockAnalysisClient::new(vec![marker("Vitamin D", 20.0, "LOW")]);
        let history: Arc<dyn HistoryStore> = Arc::new(MemoryHistoryStore::new());
        let p = processor(
            Box::new(analysis),
            Box::new(MockResearchClient {
                notes: vec!["note".into()],
                fail: false,
            }),
            None,
            Arc::clone(&history),
        );

        let outcome = p.process(&doc(SAMPLE_REPORT, "report.pdf"), "/files/x.pdf").unwrap();

        assert!(outcome.patient_token.starts_with("PT_"));
        assert_eq!(outcome.lab_date.to_string(), "2024-03-05");
        assert!(!outcome.used_fallback);
        assert!(!outcome.unpersisted);
        assert_eq!(outcome.biomarkers.len(), 1);
        assert_eq!(
            outcome.biomarkers[0].research_notes.as_deref(),
            Some(["note".to_string()].as_slice())
        );

        let persisted = history.read_all(&outcome.patient_token).unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].file_url, "/files/x.pdf");
        assert_eq!(persisted[0].original_filename, "report.pdf");
    }

    #[test]
    fn analysis_never_sees_raw_identifiers() {
        let analysis = Arc::new(MockAnalysisClient::new(vec![]));
        let p = processor(
            Box::new(SharedAnalysis(Arc::clone(&analysis))),
            Box::new(MockResearchClient {
                notes: vec![],
                fail: false,
            }),
            None,
            Arc::new(MemoryHistoryStore::new()),
        );

        let outcome = p.process(&doc(SAMPLE_REPORT, "report.pdf"), "/files/x.pdf").unwrap();

        let seen = analysis.seen_text.lock().unwrap().clone().unwrap();
        assert!(!seen.contains("John"));
        assert!(!seen.contains("Smith"));
        assert!(!seen.contains("01/02/1990"));
        assert!(seen.contains("DOB_REDACTED"));
        assert!(seen.contains(&outcome.patient_token));
    }

    #[test]
    fn second_upload_carries_previous_biomarkers_as_context() {
        let history: Arc<dyn HistoryStore> = Arc::new(MemoryHistoryStore::new());

        let first = MockAnalysisClient::new(vec![marker("Ferritin", 15.0, "LOW")]);
        let p = processor(
            Box::new(first),
            Box::new(MockResearchClient {
                notes: vec![],
                fail: false,
            }),
            None,
            Arc::clone(&history),
        );
        p.process(&doc(SAMPLE_REPORT, "march.pdf"), "/files/a.pdf").unwrap();

        let second = Arc::new(MockAnalysisClient::new(vec![marker("Ferritin", 30.0, "NORMAL")]));
        let p = processor(
            Box::new(SharedAnalysis(Arc::clone(&second))),
            Box::new(MockResearchClient {
                notes: vec![],
                fail: false,
            }),
            None,
            Arc::clone(&history),
        );
        p.process(&doc(SAMPLE_REPORT, "june.pdf"), "/files/b.pdf").unwrap();

        let seen = second.seen_previous.lock().unwrap().clone().unwrap();
        let context = seen.expect("second run should carry previous biomarkers");
        assert!(context.contains("Ferritin"));
        assert!(context.contains("15"));
    }

    /// Adapter so a test can keep a handle on a mock after boxing it.
    struct SharedAnalysis(Arc<MockAnalysisClient>);

    impl AnalysisClient for SharedAnalysis {
        fn analyze(
            &self,
            sanitized_text: &str,
            previous_biomarkers: Option<&str>,
        ) -> Result<crate::models::AnalysisResult, crate::remote::AnalysisError> {
            self.0.analyze(sanitized_text, previous_biomarkers)
        }
    }

    #[test]
    fn analysis_failure_substitutes_fallback_biomarkers() {
        let p = processor(
            Box::new(DisabledAnalysisClient),
            Box::new(MockResearchClient {
                notes: vec![],
                fail: false,
            }),
            None,
            Arc::new(MemoryHistoryStore::new()),
        );

        let outcome = p.process(&doc(SAMPLE_REPORT, "report.pdf"), "/files/x.pdf").unwrap();
        assert!(outcome.used_fallback);
        assert_eq!(outcome.biomarkers.len(), 2);
        assert_eq!(outcome.biomarkers[0].name, "Vitamin D");
        assert_eq!(outcome.biomarkers[1].name, "Ferritin");
    }

    #[test]
    fn research_failure_leaves_biomarkers_bare() {
        let analysis = MockAnalysisClient::new(vec![marker("Vitamin D", 20.0, "LOW")]);
        let p = processor(
            Box::new(analysis),
            Box::new(MockResearchClient {
                notes: vec![],
                fail: true,
            }),
            None,
            Arc::new(MemoryHistoryStore::new()),
        );

        let outcome = p.process(&doc(SAMPLE_REPORT, "report.pdf"), "/files/x.pdf").unwrap();
        assert!(outcome.biomarkers[0].research_notes.is_none());
    }

    #[test]
    fn normal_biomarkers_skip_research() {
        let analysis = MockAnalysisClient::new(vec![marker("Glucose", 90.0, "NORMAL")]);
        let p = processor(
            Box::new(analysis),
            Box::new(MockResearchClient {
                notes: vec!["should not appear".into()],
                fail: false,
            }),
            None,
            Arc::new(MemoryHistoryStore::new()),
        );

        let outcome = p.process(&doc(SAMPLE_REPORT, "report.pdf"), "/files/x.pdf").unwrap();
        assert!(outcome.biomarkers[0].research_notes.is_none());
    }

    #[test]
    fn vault_token_replaces_local_token_in_text_only() {
        let analysis = Arc::new(MockAnalysisClient::new(vec![]));
        let p = processor(
            Box::new(SharedAnalysis(Arc::clone(&analysis))),
            Box::new(MockResearchClient {
                notes: vec![],
                fail: false,
            }),
            Some(Box::new(MockVaultClient {
                tokens: VaultTokens {
                    name_token: Some("tok_vault_name".into()),
                    dob_token: Some("tok_vault_dob".into()),
                },
                fail: false,
            })),
            Arc::new(MemoryHistoryStore::new()),
        );

        let outcome = p.process(&doc(SAMPLE_REPORT, "report.pdf"), "/files/x.pdf").unwrap();

        // Record key stays local.
        assert!(outcome.patient_token.starts_with("PT_"));

        let seen = analysis.seen_text.lock().unwrap().clone().unwrap();
        assert!(seen.contains("tok_vault_name"));
        assert!(!seen.contains(&outcome.patient_token));
    }

    #[test]
    fn vault_failure_keeps_local_token() {
        let analysis = Arc::new(MockAnalysisClient::new(vec![]));
        let p = processor(
            Box::new(SharedAnalysis(Arc::clone(&analysis))),
            Box::new(MockResearchClient {
                notes: vec![],
                fail: false,
            }),
            Some(Box::new(MockVaultClient {
                tokens: VaultTokens::default(),
                fail: true,
            })),
            Arc::new(MemoryHistoryStore::new()),
        );

        let outcome = p.process(&doc(SAMPLE_REPORT, "report.pdf"), "/files/x.pdf").unwrap();
        let seen = analysis.seen_text.lock().unwrap().clone().unwrap();
        assert!(seen.contains(&outcome.patient_token));
    }

    #[test]
    fn anonymous_document_gets_token_and_completes() {
        let analysis = MockAnalysisClient::new(vec![]);
        let p = processor(
            Box::new(analysis),
            Box::new(MockResearchClient {
                notes: vec![],
                fail: false,
            }),
            // A configured vault must not be called with nothing extracted.
            Some(Box::new(MockVaultClient {
                tokens: VaultTokens::default(),
                fail: true,
            })),
            Arc::new(MemoryHistoryStore::new()),
        );

        let outcome = p
            .process(&doc("Vitamin D: 20 ng/mL LOW", "report.pdf"), "/files/x.pdf")
            .unwrap();
        assert!(outcome.patient_token.starts_with("PT_"));
        assert!(!outcome.unpersisted);
    }

    #[test]
    fn history_append_failure_is_reported_not_fatal() {
        let analysis = MockAnalysisClient::new(vec![]);
        let p = processor(
            Box::new(analysis),
            Box::new(MockResearchClient {
                notes: vec![],
                fail: false,
            }),
            None,
            Arc::new(crate::history::UnavailableHistoryStore),
        );

        let outcome = p.process(&doc(SAMPLE_REPORT, "report.pdf"), "/files/x.pdf").unwrap();
        assert!(outcome.unpersisted);
    }

    #[test]
    fn filename_date_used_when_text_has_none() {
        let analysis = MockAnalysisClient::new(vec![]);
        let p = processor(
            Box::new(analysis),
            Box::new(MockResearchClient {
                notes: vec![],
                fail: false,
            }),
            None,
            Arc::new(MemoryHistoryStore::new()),
        );

        let outcome = p
            .process(
                &doc("Vitamin D: 20 ng/mL LOW", "labs_2024-03-05.pdf"),
                "/files/x.pdf",
            )
            .unwrap();
        assert_eq!(outcome.lab_date.to_string(), "2024-03-05");
    }
}
