// SPDX-License-Identifier: Apache-2.0

use crate::error::LedgerError;
use crate::store::{ClaimStore, EvidenceStore};
use loma_impact_model::{Claim, Evidence, KpiId, TenantId};
use serde::Serialize;

/// Evidence coverage for one KPI's claim set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct CoverageReport {
    pub total_claims: usize,
    pub proven_claims: usize,
    pub percent: u32,
}

/// Whether one evidence record proves one claim.
///
/// A claim without `date_represented` is unmatchable, as is evidence
/// carrying neither a date nor a full range; missing dates never match.
#[must_use]
pub fn evidence_covers_claim(claim: &Claim, evidence: &Evidence) -> bool {
    let Some(date) = claim.date_represented.as_ref() else {
        return false;
    };
    if evidence.date_represented.as_ref() == Some(date) {
        return true;
    }
    evidence
        .date_range
        .as_ref()
        .is_some_and(|span| span.contains(date))
}

/// Pure, order-independent coverage over unordered claim and evidence
/// sets. `percent` is `round(100 * proven / total)`, 0 for no claims.
#[must_use]
pub fn coverage(claims: &[Claim], evidence: &[Evidence]) -> CoverageReport {
    let total_claims = claims.len();
    let proven_claims = claims
        .iter()
        .filter(|claim| evidence.iter().any(|e| evidence_covers_claim(claim, e)))
        .count();
    CoverageReport {
        total_claims,
        proven_claims,
        percent: percent_of(proven_claims, total_claims),
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn percent_of(proven: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * proven as f64 / total as f64).round() as u32
}

/// Coverage for a KPI, gathering its claims and every evidence record
/// linked to it (coarse KPI link or precise claim link). The caller is
/// responsible for having resolved the KPI itself; an unknown or
/// foreign `kpi_id` yields an empty claim set and therefore 0.
pub fn coverage_for_kpi<S>(
    store: &S,
    tenant: &TenantId,
    kpi_id: &KpiId,
) -> Result<CoverageReport, LedgerError>
where
    S: ClaimStore + EvidenceStore,
{
    let claims = store.list_claims_for_kpi(tenant, kpi_id)?;
    let evidence = store.list_evidence_for_kpi(tenant, kpi_id)?;
    Ok(coverage(&claims, &evidence))
}
