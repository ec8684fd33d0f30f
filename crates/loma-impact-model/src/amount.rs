// SPDX-License-Identifier: Apache-2.0

use crate::ids::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A finite, non-negative measured quantity.
///
/// Claim values and credited values are plain numbers on the wire (the
/// upstream store kept them as SQL numerics); construction rejects NaN,
/// infinities, and negatives so ledger arithmetic never has to re-check.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Amount(f64);

impl Amount {
    pub fn parse(value: f64) -> Result<Self, ParseError> {
        if !value.is_finite() {
            return Err(ParseError::InvalidFormat("amount must be a finite number"));
        }
        if value < 0.0 {
            return Err(ParseError::InvalidFormat("amount must not be negative"));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Two-decimal rendering used by user-facing remainder messages.
    #[must_use]
    pub fn fixed2(self) -> String {
        format!("{:.2}", self.0)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<f64> for Amount {
    type Error = ParseError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Amount> for f64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}
