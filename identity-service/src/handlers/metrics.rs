use axum::{http::header, response::IntoResponse};

use crate::services::metrics::get_metrics;

/// Prometheus scrape endpoint: HTTP request metrics plus the
/// `identity_sign_in_total` and `identity_verification_created_total` counters.
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        get_metrics(),
    )
}
