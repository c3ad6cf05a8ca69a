//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! `/analyze` is kept as an alias of `/analyze_bloodwork` for older
//! clients.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Upload size cap. Lab report PDFs are small; anything near this limit
/// is not a lab report.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn api_router(ctx: ApiContext, cors_origin: &str) -> Router {
    let allow_origin = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            tracing::warn!(cors_origin, "unparseable CORS origin, allowing any");
            AllowOrigin::any()
        }
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/analyze_bloodwork", post(endpoints::analyze::upload))
        .route("/analyze", post(endpoints::analyze::upload))
        .route("/history/:patient_token", get(endpoints::history::list))
        .route("/files/:filename", get(endpoints::files::fetch))
        .route("/health", get(endpoints::health::check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(ctx)
}
