// SPDX-License-Identifier: Apache-2.0

//! Repair of credits whose ceiling shrank underneath them.
//!
//! Claims are owned by the record-keeping layer and can be edited or
//! deleted after credits exist. The policy here: deleting a claim
//! removes its claim-level credits; any scope left over its ceiling has
//! every credit scaled by `ceiling / total`, floored to two decimals so
//! the repaired sum never exceeds the ceiling. Runs inside the same
//! transaction as the claim mutation. Post-condition: no scope total
//! exceeds its ceiling.

use crate::availability::measured_total;
use crate::error::LedgerError;
use crate::store::sqlite::fetch_claims_for_kpi;
use loma_impact_model::{ClaimId, CreditId, DonorId, KpiId, TenantId};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct CappedCredit {
    pub id: CreditId,
    pub donor_id: DonorId,
    pub previous_value: f64,
    pub new_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct ReconcileReport {
    pub removed: Vec<CreditId>,
    pub capped: Vec<CappedCredit>,
}

impl ReconcileReport {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.capped.is_empty()
    }

    pub(crate) fn merge(&mut self, other: Self) {
        self.removed.extend(other.removed);
        self.capped.extend(other.capped);
    }
}

/// Full repair pass over one KPI: orphaned claim-level credits are
/// removed, then the metric scope and every claim scope are capped.
pub(crate) fn reconcile_kpi_tx(
    conn: &Connection,
    tenant: &TenantId,
    kpi_id: &KpiId,
) -> Result<ReconcileReport, LedgerError> {
    let mut report = remove_orphaned_claim_credits(conn, tenant, kpi_id)?;
    report.merge(reconcile_metric_scope(conn, tenant, kpi_id)?);
    let claim_ids: Vec<ClaimId> = fetch_claims_for_kpi(conn, kpi_id)?
        .into_iter()
        .map(|c| c.id)
        .collect();
    for claim_id in &claim_ids {
        report.merge(reconcile_claim_scope(conn, tenant, kpi_id, claim_id)?);
    }
    if !report.is_noop() {
        info!(
            kpi_id = kpi_id.as_str(),
            removed = report.removed.len(),
            capped = report.capped.len(),
            "reconciled over-ceiling credits"
        );
    }
    Ok(report)
}

pub(crate) fn reconcile_metric_scope(
    conn: &Connection,
    tenant: &TenantId,
    kpi_id: &KpiId,
) -> Result<ReconcileReport, LedgerError> {
    let ceiling = measured_total(&fetch_claims_for_kpi(conn, kpi_id)?);
    let rows = scope_rows(
        conn,
        "SELECT id, donor_id, credited_value FROM donor_credits
         WHERE user_id = ?1 AND kpi_id = ?2 AND kpi_update_id IS NULL ORDER BY id",
        params![tenant.as_str(), kpi_id.as_str()],
    )?;
    cap_rows(conn, rows, ceiling)
}

pub(crate) fn reconcile_claim_scope(
    conn: &Connection,
    tenant: &TenantId,
    kpi_id: &KpiId,
    claim_id: &ClaimId,
) -> Result<ReconcileReport, LedgerError> {
    let ceiling: Option<f64> = conn
        .query_row(
            "SELECT value FROM kpi_updates WHERE id = ?1 AND kpi_id = ?2",
            params![claim_id.as_str(), kpi_id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    let Some(ceiling) = ceiling else {
        return remove_claim_credits(conn, claim_id);
    };
    let rows = scope_rows(
        conn,
        "SELECT id, donor_id, credited_value FROM donor_credits
         WHERE user_id = ?1 AND kpi_update_id = ?2 ORDER BY id",
        params![tenant.as_str(), claim_id.as_str()],
    )?;
    cap_rows(conn, rows, ceiling)
}

/// Delete every credit attributed to one claim, reporting the removals.
pub(crate) fn remove_claim_credits(
    conn: &Connection,
    claim_id: &ClaimId,
) -> Result<ReconcileReport, LedgerError> {
    let mut stmt = conn.prepare_cached(
        "SELECT id FROM donor_credits WHERE kpi_update_id = ?1 ORDER BY id",
    )?;
    let ids = stmt
        .query_map(params![claim_id.as_str()], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    conn.execute(
        "DELETE FROM donor_credits WHERE kpi_update_id = ?1",
        params![claim_id.as_str()],
    )?;
    let mut removed = Vec::with_capacity(ids.len());
    for id in ids {
        removed.push(credit_id_from_rowid(id)?);
    }
    Ok(ReconcileReport {
        removed,
        capped: Vec::new(),
    })
}

fn remove_orphaned_claim_credits(
    conn: &Connection,
    tenant: &TenantId,
    kpi_id: &KpiId,
) -> Result<ReconcileReport, LedgerError> {
    let mut stmt = conn.prepare_cached(
        "SELECT id FROM donor_credits
         WHERE user_id = ?1 AND kpi_id = ?2 AND kpi_update_id IS NOT NULL
           AND kpi_update_id NOT IN (SELECT id FROM kpi_updates)
         ORDER BY id",
    )?;
    let ids = stmt
        .query_map(params![tenant.as_str(), kpi_id.as_str()], |row| {
            row.get::<_, i64>(0)
        })?
        .collect::<Result<Vec<_>, _>>()?;
    let mut removed = Vec::with_capacity(ids.len());
    for id in &ids {
        conn.execute("DELETE FROM donor_credits WHERE id = ?1", params![id])?;
        removed.push(credit_id_from_rowid(*id)?);
    }
    Ok(ReconcileReport {
        removed,
        capped: Vec::new(),
    })
}

fn scope_rows(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<(i64, String, f64)>, LedgerError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn cap_rows(
    conn: &Connection,
    rows: Vec<(i64, String, f64)>,
    ceiling: f64,
) -> Result<ReconcileReport, LedgerError> {
    let total: f64 = rows.iter().map(|(_, _, v)| v).sum();
    if total <= ceiling {
        return Ok(ReconcileReport::default());
    }
    let factor = if ceiling <= 0.0 { 0.0 } else { ceiling / total };
    let mut capped = Vec::with_capacity(rows.len());
    for (rowid, donor_id, previous_value) in rows {
        let new_value = scale_down(previous_value, factor);
        conn.execute(
            "UPDATE donor_credits SET credited_value = ?1 WHERE id = ?2",
            params![new_value, rowid],
        )?;
        capped.push(CappedCredit {
            id: credit_id_from_rowid(rowid)?,
            donor_id: DonorId::parse(&donor_id)
                .map_err(|e| LedgerError::Store(format!("corrupt row: {e}")))?,
            previous_value,
            new_value,
        });
    }
    Ok(ReconcileReport {
        removed: Vec::new(),
        capped,
    })
}

/// Floored to two decimals: the sum of floored shares stays at or below
/// the ceiling, which a round-to-nearest could overshoot.
fn scale_down(value: f64, factor: f64) -> f64 {
    ((value * factor) * 100.0).floor() / 100.0
}

pub(crate) fn credit_id_from_rowid(rowid: i64) -> Result<CreditId, LedgerError> {
    CreditId::parse(&rowid.to_string())
        .map_err(|e| LedgerError::Store(format!("invalid credit rowid: {e}")))
}
