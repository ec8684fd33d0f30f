// SPDX-License-Identifier: Apache-2.0

use crate::AppState;
use axum::extract::{MatchedPath, Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::{info, warn};

/// Request id propagation, structured request logging, per-route
/// metrics, the request deadline, and shutdown-drain shedding. The id
/// comes from an inbound `x-request-id` when present so traces line up
/// across the proxy chain.
pub(crate) async fn request_observability(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path().to_string(), |p| p.as_str().to_string());
    let method = request.method().clone();
    let request_id = propagated_request_id(&request, &state);

    let mut response = if !state.accepting_requests.load(Ordering::Relaxed) {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "server is draining" })),
        )
            .into_response()
    } else {
        match tokio::time::timeout(state.api.request_timeout, next.run(request)).await {
            Ok(response) => response,
            Err(_) => {
                warn!(route = %route, request_id = %request_id, "request deadline exceeded");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": "request timed out" })),
                )
                    .into_response()
            }
        }
    };

    let status = response.status().as_u16();
    let latency = started.elapsed();
    state.metrics.observe_request(&route, status, latency).await;
    info!(
        %method,
        route = %route,
        status,
        latency_ms = latency.as_millis() as u64,
        request_id = %request_id,
        "request"
    );
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

fn propagated_request_id(request: &Request, state: &AppState) -> String {
    if let Some(raw) = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
    {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}
