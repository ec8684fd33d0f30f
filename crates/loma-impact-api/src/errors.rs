// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ApiErrorCode {
    ValidationFailed,
    AllocationExceeded,
    Unauthorized,
    NotFound,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
        }
    }

    #[must_use]
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::ValidationFailed, message, Value::Null)
    }

    #[must_use]
    pub fn invalid_field(field: &str, reason: &str) -> Self {
        Self::new(
            ApiErrorCode::ValidationFailed,
            format!("invalid {field}: {reason}"),
            json!({"field_errors": [{"field": field, "reason": reason}]}),
        )
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(
            ApiErrorCode::Unauthorized,
            "missing or malformed x-user-id header",
            Value::Null,
        )
    }

    #[must_use]
    pub fn not_found(entity: &str) -> Self {
        Self::new(
            ApiErrorCode::NotFound,
            format!("{entity} not found"),
            Value::Null,
        )
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::new(
            ApiErrorCode::Internal,
            "internal server error",
            Value::Null,
        )
    }

    #[must_use]
    pub fn allocation_exceeded(message: impl Into<String>, available: f64) -> Self {
        Self::new(
            ApiErrorCode::AllocationExceeded,
            message,
            json!({"available": available}),
        )
    }

    /// Exact wire body. `AllocationExceeded` carries the remainder at
    /// the top level so clients can self-correct without reparsing the
    /// message.
    #[must_use]
    pub fn wire_body(&self) -> Value {
        match self.code {
            ApiErrorCode::AllocationExceeded => json!({
                "error": self.message,
                "available": self.details.get("available").cloned().unwrap_or(Value::Null),
            }),
            _ => json!({ "error": self.message }),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
