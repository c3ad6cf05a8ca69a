//! De-identification and record-linkage service for lab report PDFs.
//!
//! Uploaded reports are stripped of direct identifiers before any text
//! leaves the process, keyed under a pseudonymous patient token derived
//! from the identifiers, and analyzed for biomarker trends across a
//! patient's uploads.

pub mod api;
pub mod config;
pub mod history;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod remote;
pub mod storage;
