// SPDX-License-Identifier: Apache-2.0

use crate::ids::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A calendar date in strict `YYYY-MM-DD` form.
///
/// Zero-padded ISO dates order correctly as plain strings, so the derived
/// `Ord` is chronological. Coverage matching and range containment rely on
/// that property; no wall-clock or timezone handling is involved anywhere
/// in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct Datestamp(String);

impl Datestamp {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let bytes = input.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return Err(ParseError::InvalidFormat("date must be YYYY-MM-DD"));
        }
        for (i, b) in bytes.iter().enumerate() {
            if i == 4 || i == 7 {
                continue;
            }
            if !b.is_ascii_digit() {
                return Err(ParseError::InvalidFormat("date must be YYYY-MM-DD"));
            }
        }
        let month = (bytes[5] - b'0') * 10 + (bytes[6] - b'0');
        let day = (bytes[8] - b'0') * 10 + (bytes[9] - b'0');
        if !(1..=12).contains(&month) {
            return Err(ParseError::InvalidFormat("date month must be 01-12"));
        }
        if !(1..=31).contains(&day) {
            return Err(ParseError::InvalidFormat("date day must be 01-31"));
        }
        Ok(Self(input.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Datestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Datestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// An inclusive `[start, end]` date interval with `start <= end`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct DateSpan {
    pub start: Datestamp,
    pub end: Datestamp,
}

impl DateSpan {
    pub fn new(start: Datestamp, end: Datestamp) -> Result<Self, ParseError> {
        if start > end {
            return Err(ParseError::InvalidFormat(
                "date range start must be <= end",
            ));
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn contains(&self, date: &Datestamp) -> bool {
        *date >= self.start && *date <= self.end
    }
}
