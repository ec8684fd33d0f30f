// SPDX-License-Identifier: Apache-2.0

use crate::dto::{CreateCreditRequest, UpdateCreditRequest};
use crate::errors::ApiError;
use loma_impact_ledger::{CreditPatch, NewCredit};
use loma_impact_model::{Amount, ClaimId, CreditId, CreditScope, DonorId, KpiId};
use std::collections::BTreeMap;

/// Query parameters of GET /donor-credits/available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityParams {
    pub scope: CreditScope,
    pub excluding_credit_id: Option<CreditId>,
}

pub fn parse_availability_params(
    query: &BTreeMap<String, String>,
) -> Result<AvailabilityParams, ApiError> {
    let kpi_id = query
        .get("kpi_id")
        .ok_or_else(|| ApiError::invalid_field("kpi_id", "required"))?;
    let kpi_id = KpiId::parse(kpi_id).map_err(|e| field_error("kpi_id", &e))?;
    let claim_id = query
        .get("kpi_update_id")
        .map(|raw| ClaimId::parse(raw).map_err(|e| field_error("kpi_update_id", &e)))
        .transpose()?;
    let excluding_credit_id = query
        .get("excluding_credit_id")
        .map(|raw| CreditId::parse(raw).map_err(|e| field_error("excluding_credit_id", &e)))
        .transpose()?;
    Ok(AvailabilityParams {
        scope: CreditScope::from_parts(kpi_id, claim_id),
        excluding_credit_id,
    })
}

pub fn parse_create_credit(body: &CreateCreditRequest) -> Result<NewCredit, ApiError> {
    Ok(NewCredit {
        donor_id: DonorId::parse(&body.donor_id).map_err(|e| field_error("donor_id", &e))?,
        kpi_id: KpiId::parse(&body.kpi_id).map_err(|e| field_error("kpi_id", &e))?,
        kpi_update_id: body
            .kpi_update_id
            .as_deref()
            .map(|raw| ClaimId::parse(raw).map_err(|e| field_error("kpi_update_id", &e)))
            .transpose()?,
        credited_value: Amount::parse(body.credited_value)
            .map_err(|e| field_error("credited_value", &e))?,
    })
}

pub fn parse_update_credit(body: &UpdateCreditRequest) -> Result<CreditPatch, ApiError> {
    let credited_value =
        Amount::parse(body.credited_value).map_err(|e| field_error("credited_value", &e))?;
    let scope = match (&body.kpi_id, &body.kpi_update_id) {
        (None, None) => None,
        (None, Some(_)) => {
            return Err(ApiError::invalid_field(
                "kpi_id",
                "required when kpi_update_id is set",
            ));
        }
        (Some(kpi_id), claim_id) => {
            let kpi_id = KpiId::parse(kpi_id).map_err(|e| field_error("kpi_id", &e))?;
            let claim_id = claim_id
                .as_deref()
                .map(|raw| ClaimId::parse(raw).map_err(|e| field_error("kpi_update_id", &e)))
                .transpose()?;
            Some(CreditScope::from_parts(kpi_id, claim_id))
        }
    };
    Ok(CreditPatch {
        credited_value,
        scope,
    })
}

fn field_error(field: &str, error: &loma_impact_model::ParseError) -> ApiError {
    ApiError::invalid_field(field, &error.to_string())
}
