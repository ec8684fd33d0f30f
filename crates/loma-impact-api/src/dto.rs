// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DonorSummaryDto {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KpiSummaryDto {
    pub id: String,
    pub title: String,
    pub unit: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimSummaryDto {
    pub id: String,
    pub value: f64,
    pub date_represented: Option<String>,
}

/// A credit row on the wire. Summaries are present on list endpoints
/// and omitted on create/update responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreditDto {
    pub id: String,
    pub donor_id: String,
    pub kpi_id: String,
    pub kpi_update_id: Option<String>,
    pub credited_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donor: Option<DonorSummaryDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpi: Option<KpiSummaryDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim: Option<ClaimSummaryDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoverageDto {
    pub kpi_id: String,
    pub total_claims: usize,
    pub proven_claims: usize,
    pub percent: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityDto {
    pub ceiling: f64,
    pub already_credited: f64,
    pub available: f64,
}

/// POST /donor-credits body. Unknown fields are tolerated; the
/// presentation layer ships more than it must.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CreateCreditRequest {
    pub donor_id: String,
    pub kpi_id: String,
    #[serde(default)]
    pub kpi_update_id: Option<String>,
    pub credited_value: f64,
}

/// PUT /donor-credits/:id body. Scope fields are optional; supplying
/// `kpi_update_id` without `kpi_id` is rejected.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UpdateCreditRequest {
    pub credited_value: f64,
    #[serde(default)]
    pub kpi_id: Option<String>,
    #[serde(default)]
    pub kpi_update_id: Option<String>,
}
