// SPDX-License-Identifier: Apache-2.0

use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use loma_impact_api::{
    availability_dto, coverage_dto, credit_dto, credit_row_dto, map_error, map_ledger_error,
    parse_availability_params, parse_create_credit, parse_update_credit, ApiError,
    CreateCreditRequest, UpdateCreditRequest, API_VERSION,
};
use loma_impact_ledger::{coverage_for_kpi, LedgerError};
use loma_impact_model::{CreditId, DonorId, KpiId, TenantId};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::error;

/// Wire error carrying its mapped status; lets handlers use `?`.
pub(crate) struct WireError(ApiError);

impl IntoResponse for WireError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(map_error(&self.0).status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.wire_body())).into_response()
    }
}

impl From<ApiError> for WireError {
    fn from(value: ApiError) -> Self {
        Self(value)
    }
}

impl From<LedgerError> for WireError {
    fn from(value: LedgerError) -> Self {
        if let LedgerError::Store(detail) = &value {
            error!(detail = %detail, "store failure");
        }
        Self(map_ledger_error(&value))
    }
}

fn tenant_from_headers(headers: &HeaderMap) -> Result<TenantId, WireError> {
    let raw = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(ApiError::unauthorized)?;
    TenantId::parse(raw).map_err(|_| ApiError::unauthorized().into())
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, WireError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::validation_failed(format!("malformed JSON body: {e}")).into())
}

pub(crate) async fn landing_handler() -> impl IntoResponse {
    Json(json!({ "service": crate::CRATE_NAME, "api_version": API_VERSION }))
}

pub(crate) async fn healthz_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readyz_handler(State(state): State<AppState>) -> Response {
    match state.store.ping() {
        Ok(()) => Json(json!({ "status": "ready" })).into_response(),
        Err(e) => {
            error!(error = %e, "readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
                .into_response()
        }
    }
}

pub(crate) async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [("content-type", "text/plain; version=0.0.4")],
        state.metrics.render().await,
    )
}

pub(crate) async fn version_handler() -> impl IntoResponse {
    Json(json!({
        "service": crate::CRATE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": API_VERSION,
    }))
}

pub(crate) async fn donor_credits_for_donor_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(donor_id): Path<String>,
) -> Result<Response, WireError> {
    let tenant = tenant_from_headers(&headers)?;
    let donor_id = DonorId::parse(&donor_id)
        .map_err(|e| ApiError::invalid_field("donor_id", &e.to_string()))?;
    let rows = state.ledger.list_for_donor(&tenant, &donor_id)?;
    let dtos: Vec<_> = rows.iter().map(credit_dto).collect();
    Ok(Json(dtos).into_response())
}

pub(crate) async fn donor_credits_for_kpi_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(kpi_id): Path<String>,
) -> Result<Response, WireError> {
    let tenant = tenant_from_headers(&headers)?;
    let kpi_id =
        KpiId::parse(&kpi_id).map_err(|e| ApiError::invalid_field("kpi_id", &e.to_string()))?;
    let rows = state.ledger.list_for_kpi(&tenant, &kpi_id)?;
    let dtos: Vec<_> = rows.iter().map(credit_dto).collect();
    Ok(Json(dtos).into_response())
}

pub(crate) async fn availability_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Response, WireError> {
    let tenant = tenant_from_headers(&headers)?;
    let params = parse_availability_params(&query)?;
    let availability = state.ledger.availability(
        &tenant,
        &params.scope,
        params.excluding_credit_id.as_ref(),
    )?;
    Ok(Json(availability_dto(&availability)).into_response())
}

pub(crate) async fn create_credit_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WireError> {
    let tenant = tenant_from_headers(&headers)?;
    let request: CreateCreditRequest = parse_body(&body)?;
    let new_credit = parse_create_credit(&request)?;
    let credit = state.ledger.create(&tenant, &new_credit)?;
    Ok((StatusCode::CREATED, Json(credit_row_dto(&credit))).into_response())
}

pub(crate) async fn update_credit_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, WireError> {
    let tenant = tenant_from_headers(&headers)?;
    let id = CreditId::parse(&id).map_err(|_| ApiError::not_found("credit"))?;
    let request: UpdateCreditRequest = parse_body(&body)?;
    let patch = parse_update_credit(&request)?;
    let credit = state.ledger.update(&tenant, &id, &patch)?;
    Ok(Json(credit_row_dto(&credit)).into_response())
}

pub(crate) async fn delete_credit_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, WireError> {
    let tenant = tenant_from_headers(&headers)?;
    let id = CreditId::parse(&id).map_err(|_| ApiError::not_found("credit"))?;
    state.ledger.delete(&tenant, &id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn kpi_coverage_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(kpi_id): Path<String>,
) -> Result<Response, WireError> {
    let tenant = tenant_from_headers(&headers)?;
    let kpi_id =
        KpiId::parse(&kpi_id).map_err(|e| ApiError::invalid_field("kpi_id", &e.to_string()))?;
    if state.store.get_kpi(&tenant, &kpi_id)?.is_none() {
        return Err(ApiError::not_found("kpi").into());
    }
    let report = coverage_for_kpi(&state.store, &tenant, &kpi_id)?;
    Ok(Json(coverage_dto(&kpi_id, &report)).into_response())
}
