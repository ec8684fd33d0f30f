// SPDX-License-Identifier: Apache-2.0

//! Collaborator store interfaces and the SQLite implementation.

use crate::error::LedgerError;
use loma_impact_model::{Claim, ClaimId, Evidence, KpiId, TenantId};

mod schema;
pub(crate) mod sqlite;

pub use sqlite::SqliteStore;

/// Read surface of the durable claim record ("KPI updates").
///
/// Claims are owned by the record-keeping CRUD layer; this subsystem
/// only ever reads them. An unknown or foreign KPI yields an empty set.
pub trait ClaimStore {
    fn list_claims_for_kpi(
        &self,
        tenant: &TenantId,
        kpi_id: &KpiId,
    ) -> Result<Vec<Claim>, LedgerError>;

    fn get_claim(&self, tenant: &TenantId, id: &ClaimId) -> Result<Option<Claim>, LedgerError>;
}

/// Read surface of the durable evidence record.
pub trait EvidenceStore {
    /// Every evidence record linked to the KPI, through the legacy
    /// coarse KPI link or through a precise claim link, deduplicated.
    fn list_evidence_for_kpi(
        &self,
        tenant: &TenantId,
        kpi_id: &KpiId,
    ) -> Result<Vec<Evidence>, LedgerError>;

    fn list_evidence_for_claim(
        &self,
        tenant: &TenantId,
        claim_id: &ClaimId,
    ) -> Result<Vec<Evidence>, LedgerError>;
}
