//! HTTP surface.
//!
//! Exposes the pipeline as a small axum API: upload a report for
//! analysis, read a patient's history back, fetch a stored original,
//! health check. The router is composable and carries all shared state
//! in an `ApiContext`.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::serve;
pub use types::ApiContext;
