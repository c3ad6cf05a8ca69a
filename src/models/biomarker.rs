//! Biomarker results as returned by the analysis collaborator.

use serde::{Deserialize, Serialize};

/// One named clinical measurement from a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biomarker {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
    /// Abnormality flag as reported: "HIGH", "LOW", "NORMAL", …
    #[serde(default)]
    pub flag: String,
    /// Advisory notes attached by the research collaborator for abnormal
    /// results. Absent for in-range values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_notes: Option<Vec<String>>,
}

impl Biomarker {
    /// Abnormal results trigger the research step.
    pub fn is_abnormal(&self) -> bool {
        self.flag == "HIGH" || self.flag == "LOW"
    }
}

/// Structured output of the analysis collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub biomarkers: Vec<Biomarker>,
}
