// SPDX-License-Identifier: Apache-2.0

use crate::errors::{ApiError, ApiErrorCode};
use loma_impact_ledger::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiErrorMapping {
    pub status_code: u16,
}

#[must_use]
pub fn map_error(error: &ApiError) -> ApiErrorMapping {
    let status_code = match error.code {
        ApiErrorCode::ValidationFailed | ApiErrorCode::AllocationExceeded => 400,
        ApiErrorCode::Unauthorized => 401,
        ApiErrorCode::NotFound => 404,
        ApiErrorCode::Internal => 500,
    };
    ApiErrorMapping { status_code }
}

/// Fold a domain error into the wire error. Store failures keep a
/// generic client message; the caller is expected to log the detail
/// server-side before mapping.
#[must_use]
pub fn map_ledger_error(error: &LedgerError) -> ApiError {
    match error {
        LedgerError::Validation(msg) => ApiError::validation_failed(msg.clone()),
        LedgerError::AllocationExceeded { available, .. } => {
            ApiError::allocation_exceeded(error.to_string(), *available)
        }
        LedgerError::NotFound(entity) => ApiError::not_found(entity),
        _ => ApiError::internal(),
    }
}
