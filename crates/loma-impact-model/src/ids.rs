// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const ID_MAX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    Empty(&'static str),
    Trimmed(&'static str),
    TooLong(&'static str, usize),
    InvalidFormat(&'static str),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty(name) => write!(f, "{name} must not be empty"),
            Self::Trimmed(name) => {
                write!(f, "{name} must not contain leading/trailing whitespace")
            }
            Self::TooLong(name, max) => write!(f, "{name} exceeds max length {max}"),
            Self::InvalidFormat(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ParseError {}

fn parse_opaque_id(name: &'static str, input: &str) -> Result<String, ParseError> {
    if input.is_empty() {
        return Err(ParseError::Empty(name));
    }
    if input.trim() != input {
        return Err(ParseError::Trimmed(name));
    }
    if input.len() > ID_MAX_LEN {
        return Err(ParseError::TooLong(name, ID_MAX_LEN));
    }
    if !input
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
    {
        return Err(ParseError::InvalidFormat(
            "identifier must contain only [A-Za-z0-9_.-]",
        ));
    }
    Ok(input.to_string())
}

macro_rules! opaque_id {
    ($(#[$doc:meta])* $type:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
        #[serde(transparent)]
        #[non_exhaustive]
        pub struct $type(String);

        impl $type {
            pub fn parse(input: &str) -> Result<Self, ParseError> {
                Ok(Self(parse_opaque_id($name, input)?))
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $type {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Opaque tenant identity supplied by the upstream auth layer.
    TenantId,
    "user_id"
);
opaque_id!(InitiativeId, "initiative_id");
opaque_id!(KpiId, "kpi_id");
opaque_id!(
    /// Identifier of a KPI update row (an impact claim).
    ClaimId,
    "kpi_update_id"
);
opaque_id!(EvidenceId, "evidence_id");
opaque_id!(DonorId, "donor_id");
opaque_id!(CreditId, "credit_id");
