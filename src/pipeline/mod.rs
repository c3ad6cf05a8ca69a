//! De-identification and analysis pipeline.
//!
//! Stages run in a fixed order: identity extraction, token derivation,
//! redaction, date resolution, analysis, research enrichment, history
//! persistence. Redaction is the one fail-closed stage; every other
//! collaborator failure degrades to a documented fallback so a single
//! upload always completes.

pub mod dates;
pub mod identity;
pub mod processor;
pub mod redact;
pub mod token;

pub use processor::{ProcessingError, ProcessingOutcome, ReportProcessor};
