// SPDX-License-Identifier: Apache-2.0

use crate::ids::{EvidenceId, ParseError};
use crate::kpi::validate_label;
use crate::time::{DateSpan, Datestamp};
use serde::{Deserialize, Serialize};

pub const KIND_MAX_LEN: usize = 64;

/// A dated proof record.
///
/// Linkage (precise per-claim links or the legacy coarse per-KPI link) is
/// a store concern; for coverage matching only the dates matter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Evidence {
    pub id: EvidenceId,
    pub kind: String,
    pub date_represented: Option<Datestamp>,
    pub date_range: Option<DateSpan>,
}

impl Evidence {
    pub fn validate(&self) -> Result<(), ParseError> {
        validate_label("evidence kind", &self.kind, KIND_MAX_LEN)
    }
}
