use crate::services::metrics::metrics;
use service_core::axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

/// Records request count and latency, labelled by route template so tokens
/// in paths never become label values.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    if let Some(m) = metrics() {
        m.http_requests_total
            .with_label_values(&[&method, &path, &status])
            .inc();
        m.http_request_duration_seconds
            .with_label_values(&[&method, &path, &status])
            .observe(duration);
    }

    response
}
