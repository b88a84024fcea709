use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderName, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::api::AppState;

/// Rendered reports carry inline styles.
const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; img-src 'self' data:; \
    style-src 'self' 'unsafe-inline'; frame-ancestors 'none'; base-uri 'self'";

const SECURITY_HEADERS: [(HeaderName, &str); 4] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
    (header::CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY),
];

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.prometheus_handle.as_ref().map_or_else(
        || "Metrics not enabled or failed to initialize".to_string(),
        metrics_exporter_prometheus::PrometheusHandle::render,
    )
}

struct RequestInfo {
    method: String,
    path: String,
    /// Route template, when the router matched one.
    route: Option<String>,
    user_agent: String,
}

impl RequestInfo {
    fn from_request(req: &Request) -> Self {
        Self {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            route: req
                .extensions()
                .get::<MatchedPath>()
                .map(|p| p.as_str().to_string()),
            user_agent: req
                .headers()
                .get(header::USER_AGENT)
                .and_then(|h| h.to_str().ok())
                .unwrap_or("unknown")
                .to_string(),
        }
    }

    fn record(&self, status: u16, elapsed: Duration) {
        // Templates keep label cardinality bounded
        let labels = [
            ("method", self.method.clone()),
            ("path", self.route.clone().unwrap_or_else(|| self.path.clone())),
            ("status", status.to_string()),
        ];
        metrics::counter!("http_requests_total", &labels).increment(1);
        metrics::histogram!("http_request_duration_seconds", &labels)
            .record(elapsed.as_secs_f64());
    }
}

const fn outcome(status: u16) -> &'static str {
    match status {
        500.. => "error",
        400..=499 => "client_error",
        _ => "success",
    }
}

/// Opens the request span and emits one event per finished request.
/// `user_id` is recorded later by the auth middleware.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let info = RequestInfo::from_request(&req);

    let span = info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %info.method,
        path = %info.path,
        route = info.route.clone(),
        user_id = tracing::field::Empty,
    );

    async move {
        let response = next.run(req).await;
        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        info.record(status, elapsed);
        info!(
            event = "http_request_finished",
            duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            status_code = status,
            user_agent = %info.user_agent,
            outcome = outcome(status),
            "Request finished"
        );

        response
    }
    .instrument(span)
    .await
}

pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome() {
        assert_eq!(outcome(200), "success");
        assert_eq!(outcome(304), "success");
        assert_eq!(outcome(422), "client_error");
        assert_eq!(outcome(503), "error");
    }
}
