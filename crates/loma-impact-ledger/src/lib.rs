#![forbid(unsafe_code)]
//! Donor credit attribution and evidence coverage.
//!
//! The one hard guarantee of this crate: the sum of donors' credited
//! amounts for a scope (a KPI's measured total, or one claim's value)
//! never exceeds the measured value after any validated write. Every
//! quantity is recomputed from the store on every call; nothing is
//! cached.

mod availability;
mod coverage;
mod error;
mod ledger;
mod reconcile;
mod store;

pub use availability::{measured_total, Availability};
pub use coverage::{coverage, coverage_for_kpi, evidence_covers_claim, CoverageReport};
pub use error::LedgerError;
pub use ledger::{
    ClaimSummary, CreditJoined, CreditLedger, CreditPatch, DonorSummary, KpiSummary, NewCredit,
};
pub use reconcile::{CappedCredit, ReconcileReport};
pub use store::{ClaimStore, EvidenceStore, SqliteStore};

pub const CRATE_NAME: &str = "loma-impact-ledger";
