#![forbid(unsafe_code)]
//! Impact model SSOT.
//!
//! Validated domain types for KPIs, claims, evidence, donors, and donor
//! credits. This crate is pure data: no I/O, no store, no HTTP.

mod amount;
mod credit;
mod donor;
mod evidence;
mod ids;
mod kpi;
mod time;

pub use amount::Amount;
pub use credit::{Credit, CreditScope};
pub use donor::{Donor, EMAIL_MAX_LEN};
pub use evidence::{Evidence, KIND_MAX_LEN};
pub use ids::{
    ClaimId, CreditId, DonorId, EvidenceId, InitiativeId, KpiId, ParseError, TenantId, ID_MAX_LEN,
};
pub use kpi::{Claim, Kpi, KpiCategory, TITLE_MAX_LEN, UNIT_MAX_LEN};
pub use time::{DateSpan, Datestamp};

pub const CRATE_NAME: &str = "loma-impact-model";
