// SPDX-License-Identifier: Apache-2.0

use loma_impact_model::ParseError;
use std::fmt;

/// Error taxonomy for ledger operations.
///
/// `AllocationExceeded` carries the computed remainder so callers can
/// render a precise message without a second round-trip. Cross-tenant
/// access always surfaces as `NotFound`; existence of another tenant's
/// rows is never revealed.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum LedgerError {
    Validation(String),
    AllocationExceeded { ceiling: f64, available: f64 },
    NotFound(&'static str),
    Store(String),
}

impl LedgerError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::AllocationExceeded { .. } => "allocation_exceeded",
            Self::NotFound(_) => "not_found",
            Self::Store(_) => "store",
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => f.write_str(msg),
            Self::AllocationExceeded { available, .. } => write!(
                f,
                "credited value exceeds the measured impact. Available: {available:.2}"
            ),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::Store(msg) => write!(f, "store operation failed: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<rusqlite::Error> for LedgerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(value.to_string())
    }
}

impl From<ParseError> for LedgerError {
    fn from(value: ParseError) -> Self {
        Self::Validation(value.to_string())
    }
}
