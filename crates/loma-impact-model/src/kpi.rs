// SPDX-License-Identifier: Apache-2.0

use crate::amount::Amount;
use crate::ids::{ClaimId, InitiativeId, KpiId, ParseError, TenantId};
use crate::time::{DateSpan, Datestamp};
use serde::{Deserialize, Serialize};

pub const TITLE_MAX_LEN: usize = 256;
pub const UNIT_MAX_LEN: usize = 64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum KpiCategory {
    Input,
    Output,
    Impact,
}

impl KpiCategory {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "input" => Ok(Self::Input),
            "output" => Ok(Self::Output),
            "impact" => Ok(Self::Impact),
            _ => Err(ParseError::InvalidFormat(
                "category must be one of 'input', 'output', 'impact'",
            )),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Impact => "impact",
        }
    }
}

/// An organization-scoped metric definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Kpi {
    pub id: KpiId,
    pub tenant: TenantId,
    pub initiative_id: InitiativeId,
    pub title: String,
    pub unit: String,
    pub category: KpiCategory,
}

impl Kpi {
    pub fn validate(&self) -> Result<(), ParseError> {
        validate_label("title", &self.title, TITLE_MAX_LEN)?;
        validate_label("unit", &self.unit, UNIT_MAX_LEN)
    }
}

/// A single dated measurement recorded against a KPI ("impact claim").
///
/// Immutable once created except through the record-keeping surface, which
/// reconciles dependent credits on every mutation. A claim carries a point
/// date, an inclusive date range (with an optional anchor date), or no
/// usable date at all; undated claims still count toward the measured
/// total but can never be proven by evidence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Claim {
    pub id: ClaimId,
    pub kpi_id: KpiId,
    pub value: Amount,
    pub date_represented: Option<Datestamp>,
    pub date_range: Option<DateSpan>,
}

impl Claim {
    #[must_use]
    pub fn new(
        id: ClaimId,
        kpi_id: KpiId,
        value: Amount,
        date_represented: Option<Datestamp>,
        date_range: Option<DateSpan>,
    ) -> Self {
        Self {
            id,
            kpi_id,
            value,
            date_represented,
            date_range,
        }
    }
}

pub(crate) fn validate_label(
    name: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ParseError> {
    if value.is_empty() {
        return Err(ParseError::Empty(name));
    }
    if value.trim() != value {
        return Err(ParseError::Trimmed(name));
    }
    if value.len() > max {
        return Err(ParseError::TooLong(name, max));
    }
    Ok(())
}
