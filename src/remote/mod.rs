//! External collaborators, specified at their interface boundary.
//!
//! Each collaborator is a trait with one HTTP implementation and a mock.
//! Calls are single-attempt with a timeout; the pipeline absorbs every
//! failure into a documented fallback value, so nothing in this module
//! ever aborts a unit of work.

pub mod analysis;
pub mod research;
pub mod vault;

pub use analysis::{AnalysisClient, AnalysisError, DisabledAnalysisClient, HttpAnalysisClient};
pub use research::{HttpResearchClient, ResearchClient, ResearchError};
pub use vault::{HttpVaultClient, VaultClient, VaultError, VaultSchema, VaultTokens};
