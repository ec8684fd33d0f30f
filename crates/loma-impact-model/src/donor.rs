// SPDX-License-Identifier: Apache-2.0

use crate::ids::{DonorId, InitiativeId, ParseError, TenantId};
use crate::kpi::validate_label;
use serde::{Deserialize, Serialize};

pub const EMAIL_MAX_LEN: usize = 254;
const NAME_MAX_LEN: usize = 256;

/// A donor scoped to one initiative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Donor {
    pub id: DonorId,
    pub tenant: TenantId,
    pub initiative_id: InitiativeId,
    pub name: String,
    pub email: String,
}

impl Donor {
    pub fn validate(&self) -> Result<(), ParseError> {
        validate_label("donor name", &self.name, NAME_MAX_LEN)?;
        validate_email(&self.email)
    }
}

fn validate_email(raw: &str) -> Result<(), ParseError> {
    if raw.is_empty() {
        return Err(ParseError::Empty("email"));
    }
    if raw.len() > EMAIL_MAX_LEN {
        return Err(ParseError::TooLong("email", EMAIL_MAX_LEN));
    }
    match raw.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(())
        }
        _ => Err(ParseError::InvalidFormat(
            "email must be of the form local@domain",
        )),
    }
}
