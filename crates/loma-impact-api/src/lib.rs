#![forbid(unsafe_code)]
//! Wire contract: DTOs, request parsing, and error mapping.
//!
//! Field names `credited_value`, `kpi_id`, `kpi_update_id`, `donor_id`
//! are the de facto contract with the presentation layer and never
//! change shape here.

mod convert;
mod dto;
mod error_mapping;
mod errors;
mod params;

pub use convert::{availability_dto, coverage_dto, credit_dto, credit_row_dto};
pub use dto::{
    AvailabilityDto, ClaimSummaryDto, CoverageDto, CreateCreditRequest, CreditDto,
    DonorSummaryDto, KpiSummaryDto, UpdateCreditRequest,
};
pub use error_mapping::{map_error, map_ledger_error, ApiErrorMapping};
pub use errors::{ApiError, ApiErrorCode};
pub use params::{parse_availability_params, parse_create_credit, parse_update_credit,
    AvailabilityParams};

pub const CRATE_NAME: &str = "loma-impact-api";
pub const API_VERSION: &str = "v1";
