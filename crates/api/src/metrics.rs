//! Prometheus request metrics.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `http_requests_total` | Counter | `method`, `handler`, `status` |
//! | `http_request_duration_seconds` | Histogram | `method`, `handler` |
//!
//! `handler` is the matched route template (`/contacts/{id}`), or `none` for
//! requests no route matched. `status` is grouped by class (`2xx`, `4xx`).
//! Each [`HttpMetrics`] owns its recorder, so several routers can live in one
//! process without sharing counters.

use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_histogram, histogram, with_local_recorder};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use crate::state::AppState;

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";

const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Prometheus content type for the text exposition format.
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Request counters and latency histograms for one router.
pub struct HttpMetrics {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl HttpMetrics {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_owned()), LATENCY_BUCKETS)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Latency buckets rejected, recording summaries");
                PrometheusBuilder::new()
            });
        let recorder = builder.build_recorder();
        let handle = recorder.handle();

        with_local_recorder(&recorder, || {
            describe_counter!(REQUESTS_TOTAL, "Total number of HTTP requests");
            describe_histogram!(REQUEST_DURATION, "HTTP request latency in seconds");
        });

        Self { recorder, handle }
    }

    /// Record one completed request.
    pub fn record(&self, method: &str, handler: &str, status: StatusCode, latency: Duration) {
        let status_class = format!("{}xx", status.as_u16() / 100);

        with_local_recorder(&self.recorder, || {
            counter!(
                REQUESTS_TOTAL,
                "method" => method.to_owned(),
                "handler" => handler.to_owned(),
                "status" => status_class
            )
            .increment(1);
            histogram!(
                REQUEST_DURATION,
                "method" => method.to_owned(),
                "handler" => handler.to_owned()
            )
            .record(latency.as_secs_f64());
        });
    }

    /// Render every metric in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl Default for HttpMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware recording the count and latency of every request.
pub async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let handler = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "none".to_owned(), |path| path.as_str().to_owned());

    let response = next.run(request).await;

    state
        .metrics()
        .record(method.as_str(), &handler, response.status(), start.elapsed());
    response
}

/// `GET /metrics`
pub async fn expose(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        state.metrics().render(),
    )
}
