// SPDX-License-Identifier: Apache-2.0

use crate::dto::{
    AvailabilityDto, ClaimSummaryDto, CoverageDto, CreditDto, DonorSummaryDto, KpiSummaryDto,
};
use loma_impact_ledger::{Availability, CoverageReport, CreditJoined};
use loma_impact_model::{ClaimId, Credit, Datestamp, KpiId};

/// Flat row shape for create/update responses.
#[must_use]
pub fn credit_row_dto(credit: &Credit) -> CreditDto {
    CreditDto {
        id: credit.id.as_str().to_string(),
        donor_id: credit.donor_id.as_str().to_string(),
        kpi_id: credit.kpi_id.as_str().to_string(),
        kpi_update_id: credit.kpi_update_id.as_ref().map(|id| id.as_str().to_string()),
        credited_value: credit.credited_value.value(),
        donor: None,
        kpi: None,
        claim: None,
    }
}

/// Joined shape for list endpoints.
#[must_use]
pub fn credit_dto(joined: &CreditJoined) -> CreditDto {
    let mut dto = credit_row_dto(&joined.credit);
    dto.donor = Some(DonorSummaryDto {
        id: joined.donor.id.as_str().to_string(),
        name: joined.donor.name.clone(),
        email: joined.donor.email.clone(),
    });
    dto.kpi = Some(KpiSummaryDto {
        id: joined.kpi.id.as_str().to_string(),
        title: joined.kpi.title.clone(),
        unit: joined.kpi.unit.clone(),
        category: joined.kpi.category.as_str().to_string(),
    });
    dto.claim = joined.claim.as_ref().map(|claim| ClaimSummaryDto {
        id: claim_id_string(&claim.id),
        value: claim.value.value(),
        date_represented: claim.date_represented.as_ref().map(date_string),
    });
    dto
}

#[must_use]
pub fn coverage_dto(kpi_id: &KpiId, report: &CoverageReport) -> CoverageDto {
    CoverageDto {
        kpi_id: kpi_id.as_str().to_string(),
        total_claims: report.total_claims,
        proven_claims: report.proven_claims,
        percent: report.percent,
    }
}

#[must_use]
pub fn availability_dto(availability: &Availability) -> AvailabilityDto {
    AvailabilityDto {
        ceiling: availability.ceiling,
        already_credited: availability.already_credited,
        available: availability.available,
    }
}

fn claim_id_string(id: &ClaimId) -> String {
    id.as_str().to_string()
}

fn date_string(date: &Datestamp) -> String {
    date.as_str().to_string()
}
