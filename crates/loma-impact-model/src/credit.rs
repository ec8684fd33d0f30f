// SPDX-License-Identifier: Apache-2.0

use crate::amount::Amount;
use crate::ids::{ClaimId, CreditId, DonorId, KpiId, TenantId};
use serde::{Deserialize, Serialize};

/// The ceiling a credit is validated against.
///
/// Metric-level credits draw on a KPI's live measured total; claim-level
/// credits draw on one claim's value. The two pools are independent
/// ledgers and are never reconciled against each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(deny_unknown_fields)]
pub enum CreditScope {
    Metric { kpi_id: KpiId },
    Claim { kpi_id: KpiId, claim_id: ClaimId },
}

impl CreditScope {
    #[must_use]
    pub fn from_parts(kpi_id: KpiId, claim_id: Option<ClaimId>) -> Self {
        match claim_id {
            Some(claim_id) => Self::Claim { kpi_id, claim_id },
            None => Self::Metric { kpi_id },
        }
    }

    #[must_use]
    pub const fn kpi_id(&self) -> &KpiId {
        match self {
            Self::Metric { kpi_id } | Self::Claim { kpi_id, .. } => kpi_id,
        }
    }

    #[must_use]
    pub const fn claim_id(&self) -> Option<&ClaimId> {
        match self {
            Self::Metric { .. } => None,
            Self::Claim { claim_id, .. } => Some(claim_id),
        }
    }

    #[must_use]
    pub const fn is_metric(&self) -> bool {
        matches!(self, Self::Metric { .. })
    }
}

/// A donor attribution row.
///
/// `kpi_update_id` null means metric-level; set means claim-level. A donor
/// holds at most one row per (donor, scope) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Credit {
    pub id: CreditId,
    pub tenant: TenantId,
    pub donor_id: DonorId,
    pub kpi_id: KpiId,
    pub kpi_update_id: Option<ClaimId>,
    pub credited_value: Amount,
}

impl Credit {
    #[must_use]
    pub fn scope(&self) -> CreditScope {
        CreditScope::from_parts(self.kpi_id.clone(), self.kpi_update_id.clone())
    }
}
