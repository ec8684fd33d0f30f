#![forbid(unsafe_code)]
//! HTTP surface for the donor credit ledger.
//!
//! Thin handlers over `loma-impact-ledger`; every request is tenant-
//! scoped by the opaque `x-user-id` header the upstream auth proxy
//! injects. No state is shared between requests beyond the store
//! handle and request metrics.

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;
use loma_impact_ledger::{CreditLedger, SqliteStore};
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;

mod api_config;
mod http;
mod middleware;
mod telemetry;

pub use api_config::ApiConfig;

pub const CRATE_NAME: &str = "loma-impact-server";

#[derive(Clone)]
pub struct AppState {
    pub store: SqliteStore,
    pub ledger: CreditLedger,
    pub api: ApiConfig,
    pub metrics: Arc<telemetry::RequestMetrics>,
    pub request_id_seed: Arc<AtomicU64>,
    pub accepting_requests: Arc<AtomicBool>,
}

impl AppState {
    #[must_use]
    pub fn new(store: SqliteStore) -> Self {
        Self::with_config(store, ApiConfig::default())
    }

    #[must_use]
    pub fn with_config(store: SqliteStore, api: ApiConfig) -> Self {
        let ledger = store.ledger();
        Self {
            store,
            ledger,
            api,
            metrics: Arc::new(telemetry::RequestMetrics::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
            accepting_requests: Arc::new(AtomicBool::new(true)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(http::handlers::landing_handler))
        .route("/healthz", get(http::handlers::healthz_handler))
        .route("/readyz", get(http::handlers::readyz_handler))
        .route("/metrics", get(http::handlers::metrics_handler))
        .route("/version", get(http::handlers::version_handler))
        .route(
            "/donor-credits/donor/:donor_id",
            get(http::handlers::donor_credits_for_donor_handler),
        )
        .route(
            "/donor-credits/metric/:kpi_id",
            get(http::handlers::donor_credits_for_kpi_handler),
        )
        .route(
            "/donor-credits/available",
            get(http::handlers::availability_handler),
        )
        .route("/donor-credits", post(http::handlers::create_credit_handler))
        .route(
            "/donor-credits/:id",
            put(http::handlers::update_credit_handler)
                .delete(http::handlers::delete_credit_handler),
        )
        .route(
            "/kpis/:kpi_id/coverage",
            get(http::handlers::kpi_coverage_handler),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::request_observability,
        ))
        .layer(DefaultBodyLimit::max(state.api.max_body_bytes))
        .with_state(state)
}
