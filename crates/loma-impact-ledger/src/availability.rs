// SPDX-License-Identifier: Apache-2.0

use crate::error::LedgerError;
use loma_impact_model::{Amount, Claim};
use serde::Serialize;

/// Remaining creditable capacity for one scope.
///
/// `available` may be negative: the scope is already over-allocated
/// (a claim shrank underneath the ledger before reconciliation ran) and
/// no further credit of any size is admitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Availability {
    pub ceiling: f64,
    pub already_credited: f64,
    pub available: f64,
}

impl Availability {
    #[must_use]
    pub fn new(ceiling: f64, already_credited: f64) -> Self {
        Self {
            ceiling,
            already_credited,
            available: ceiling - already_credited,
        }
    }

    #[must_use]
    pub fn admits(&self, candidate: Amount) -> bool {
        self.already_credited + candidate.value() <= self.ceiling
    }

    /// Gate used by credit create/update.
    pub fn check(&self, candidate: Amount) -> Result<(), LedgerError> {
        if self.admits(candidate) {
            Ok(())
        } else {
            Err(LedgerError::AllocationExceeded {
                ceiling: self.ceiling,
                available: self.available,
            })
        }
    }
}

/// Live measured total of a KPI: the sum of its claim values.
///
/// Recomputed from the claim set on every call; claims can be added or
/// edited after a credit exists, so this is never cached.
#[must_use]
pub fn measured_total(claims: &[Claim]) -> f64 {
    claims.iter().map(|c| c.value.value()).sum()
}
