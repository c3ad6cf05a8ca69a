pub mod biomarker;
pub mod history;
pub mod report;

pub use biomarker::{AnalysisResult, Biomarker};
pub use history::HistoryEntry;
pub use report::{DobMatch, IdentityFields, RawDocument};
