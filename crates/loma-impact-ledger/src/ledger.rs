// SPDX-License-Identifier: Apache-2.0

//! The donor credit ledger.
//!
//! Every write re-derives ceiling and running total from the store
//! inside one IMMEDIATE transaction, so the check-and-write is atomic:
//! two concurrent writers against the same scope serialize instead of
//! both reading a stale total. Client-submitted totals are never
//! trusted.

use crate::availability::{measured_total, Availability};
use crate::error::LedgerError;
use crate::reconcile::{self, credit_id_from_rowid, ReconcileReport};
use crate::store::sqlite::{fetch_claim, fetch_claims_for_kpi, fetch_donor, fetch_kpi, lock};
use loma_impact_model::{
    Amount, Claim, ClaimId, Credit, CreditId, CreditScope, Datestamp, DonorId, KpiCategory, KpiId,
    TenantId,
};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};

/// Input for a credit create.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCredit {
    pub donor_id: DonorId,
    pub kpi_id: KpiId,
    pub kpi_update_id: Option<ClaimId>,
    pub credited_value: Amount,
}

/// Input for a credit update: a new value, optionally a new scope.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditPatch {
    pub credited_value: Amount,
    pub scope: Option<CreditScope>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonorSummary {
    pub id: DonorId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KpiSummary {
    pub id: KpiId,
    pub title: String,
    pub unit: String,
    pub category: KpiCategory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimSummary {
    pub id: ClaimId,
    pub value: Amount,
    pub date_represented: Option<Datestamp>,
}

/// A credit row joined with donor/kpi/claim display summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditJoined {
    pub credit: Credit,
    pub donor: DonorSummary,
    pub kpi: KpiSummary,
    pub claim: Option<ClaimSummary>,
}

/// Tenant-scoped CRUD over donor credits, gated by allocation
/// validation. Obtain via [`crate::SqliteStore::ledger`].
#[derive(Clone)]
pub struct CreditLedger {
    conn: Arc<Mutex<Connection>>,
}

impl CreditLedger {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Create a credit. A create that targets a (donor, scope) pair
    /// which already holds a row is applied as an edit of that row; a
    /// donor never holds two rows in one scope.
    pub fn create(&self, tenant: &TenantId, new: &NewCredit) -> Result<Credit, LedgerError> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if fetch_donor(&tx, tenant, &new.donor_id)?.is_none() {
            return Err(LedgerError::NotFound("donor"));
        }
        let scope = CreditScope::from_parts(new.kpi_id.clone(), new.kpi_update_id.clone());
        let rowid = match existing_scope_row(&tx, tenant, &new.donor_id, &scope)? {
            Some(rowid) => {
                scope_availability(&tx, tenant, &scope, Some(rowid))?.check(new.credited_value)?;
                tx.execute(
                    "UPDATE donor_credits SET credited_value = ?1 WHERE id = ?2",
                    params![new.credited_value.value(), rowid],
                )?;
                rowid
            }
            None => {
                scope_availability(&tx, tenant, &scope, None)?.check(new.credited_value)?;
                tx.execute(
                    "INSERT INTO donor_credits
                         (user_id, donor_id, kpi_id, kpi_update_id, credited_value)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        tenant.as_str(),
                        new.donor_id.as_str(),
                        new.kpi_id.as_str(),
                        new.kpi_update_id.as_ref().map(ClaimId::as_str),
                        new.credited_value.value(),
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };
        tx.commit()?;
        Ok(Credit {
            id: credit_id_from_rowid(rowid)?,
            tenant: tenant.clone(),
            donor_id: new.donor_id.clone(),
            kpi_id: new.kpi_id.clone(),
            kpi_update_id: new.kpi_update_id.clone(),
            credited_value: new.credited_value,
        })
    }

    /// Update a credit's value and/or scope. The row under edit is
    /// excluded from the running total before the new value is checked,
    /// so a donor can always raise their own credit within the
    /// remainder.
    pub fn update(
        &self,
        tenant: &TenantId,
        id: &CreditId,
        patch: &CreditPatch,
    ) -> Result<Credit, LedgerError> {
        let rowid = credit_rowid(id)?;
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current =
            fetch_credit(&tx, tenant, rowid)?.ok_or(LedgerError::NotFound("credit"))?;
        let scope = patch.scope.clone().unwrap_or_else(|| current.scope());
        if let Some(other) = existing_scope_row(&tx, tenant, &current.donor_id, &scope)? {
            if other != rowid {
                return Err(LedgerError::Validation(
                    "donor already holds a credit for this scope".to_string(),
                ));
            }
        }
        scope_availability(&tx, tenant, &scope, Some(rowid))?.check(patch.credited_value)?;
        tx.execute(
            "UPDATE donor_credits SET kpi_id = ?1, kpi_update_id = ?2, credited_value = ?3
             WHERE id = ?4",
            params![
                scope.kpi_id().as_str(),
                scope.claim_id().map(ClaimId::as_str),
                patch.credited_value.value(),
                rowid,
            ],
        )?;
        tx.commit()?;
        Ok(Credit {
            id: id.clone(),
            tenant: tenant.clone(),
            donor_id: current.donor_id,
            kpi_id: scope.kpi_id().clone(),
            kpi_update_id: scope.claim_id().cloned(),
            credited_value: patch.credited_value,
        })
    }

    /// Remove a credit. Never validated: removal can only decrease
    /// totals.
    pub fn delete(&self, tenant: &TenantId, id: &CreditId) -> Result<(), LedgerError> {
        let rowid = credit_rowid(id)?;
        let conn = lock(&self.conn)?;
        let changed = conn.execute(
            "DELETE FROM donor_credits WHERE id = ?1 AND user_id = ?2",
            params![rowid, tenant.as_str()],
        )?;
        if changed == 0 {
            return Err(LedgerError::NotFound("credit"));
        }
        Ok(())
    }

    pub fn list_for_donor(
        &self,
        tenant: &TenantId,
        donor_id: &DonorId,
    ) -> Result<Vec<CreditJoined>, LedgerError> {
        let conn = lock(&self.conn)?;
        if fetch_donor(&conn, tenant, donor_id)?.is_none() {
            return Err(LedgerError::NotFound("donor"));
        }
        joined_rows(
            &conn,
            "c.donor_id = ?2",
            params![tenant.as_str(), donor_id.as_str()],
            tenant,
        )
    }

    pub fn list_for_kpi(
        &self,
        tenant: &TenantId,
        kpi_id: &KpiId,
    ) -> Result<Vec<CreditJoined>, LedgerError> {
        let conn = lock(&self.conn)?;
        if fetch_kpi(&conn, tenant, kpi_id)?.is_none() {
            return Err(LedgerError::NotFound("kpi"));
        }
        joined_rows(
            &conn,
            "c.kpi_id = ?2",
            params![tenant.as_str(), kpi_id.as_str()],
            tenant,
        )
    }

    /// Running total for a scope, optionally excluding one row. The one
    /// aggregate both availability and validation read; there is no
    /// second arithmetic path to drift from.
    pub fn total_for_scope(
        &self,
        tenant: &TenantId,
        scope: &CreditScope,
        excluding: Option<&CreditId>,
    ) -> Result<f64, LedgerError> {
        let excluding = excluding.map(credit_rowid).transpose()?;
        let conn = lock(&self.conn)?;
        scope_total(&conn, tenant, scope, excluding)
    }

    /// Remaining creditable capacity for a scope, excluding the row
    /// under edit if any.
    pub fn availability(
        &self,
        tenant: &TenantId,
        scope: &CreditScope,
        excluding: Option<&CreditId>,
    ) -> Result<Availability, LedgerError> {
        let excluding = excluding.map(credit_rowid).transpose()?;
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        let availability = scope_availability(&tx, tenant, scope, excluding)?;
        tx.commit()?;
        Ok(availability)
    }

    /// Repair pass for one KPI after external claim mutations; see
    /// [`crate::ReconcileReport`].
    pub fn reconcile_kpi(
        &self,
        tenant: &TenantId,
        kpi_id: &KpiId,
    ) -> Result<ReconcileReport, LedgerError> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if fetch_kpi(&tx, tenant, kpi_id)?.is_none() {
            return Err(LedgerError::NotFound("kpi"));
        }
        let report = reconcile::reconcile_kpi_tx(&tx, tenant, kpi_id)?;
        tx.commit()?;
        Ok(report)
    }
}

/// Ceiling and running total for a scope, read from live store state.
///
/// Metric scope: the KPI's measured total, summed from its claims on
/// every call. Claim scope: that claim's value. Also verifies the scope
/// actually exists for this tenant.
fn scope_availability(
    conn: &Connection,
    tenant: &TenantId,
    scope: &CreditScope,
    excluding: Option<i64>,
) -> Result<Availability, LedgerError> {
    if fetch_kpi(conn, tenant, scope.kpi_id())?.is_none() {
        return Err(LedgerError::NotFound("kpi"));
    }
    let ceiling = match scope {
        CreditScope::Metric { kpi_id } => measured_total(&fetch_claims_for_kpi(conn, kpi_id)?),
        CreditScope::Claim { kpi_id, claim_id } => {
            let claim = fetch_claim(conn, tenant, claim_id)?
                .filter(|c: &Claim| &c.kpi_id == kpi_id)
                .ok_or(LedgerError::NotFound("kpi update"))?;
            claim.value.value()
        }
    };
    let already_credited = scope_total(conn, tenant, scope, excluding)?;
    Ok(Availability::new(ceiling, already_credited))
}

fn scope_total(
    conn: &Connection,
    tenant: &TenantId,
    scope: &CreditScope,
    excluding: Option<i64>,
) -> Result<f64, LedgerError> {
    let mut stmt = conn.prepare_cached(
        "SELECT COALESCE(SUM(credited_value), 0.0) FROM donor_credits
         WHERE user_id = ?1 AND kpi_id = ?2
           AND ((?3 IS NULL AND kpi_update_id IS NULL) OR kpi_update_id = ?3)
           AND (?4 IS NULL OR id <> ?4)",
    )?;
    let total = stmt.query_row(
        params![
            tenant.as_str(),
            scope.kpi_id().as_str(),
            scope.claim_id().map(ClaimId::as_str),
            excluding,
        ],
        |row| row.get(0),
    )?;
    Ok(total)
}

fn existing_scope_row(
    conn: &Connection,
    tenant: &TenantId,
    donor_id: &DonorId,
    scope: &CreditScope,
) -> Result<Option<i64>, LedgerError> {
    let mut stmt = conn.prepare_cached(
        "SELECT id FROM donor_credits
         WHERE user_id = ?1 AND donor_id = ?2 AND kpi_id = ?3
           AND ((?4 IS NULL AND kpi_update_id IS NULL) OR kpi_update_id = ?4)",
    )?;
    let rowid = stmt
        .query_row(
            params![
                tenant.as_str(),
                donor_id.as_str(),
                scope.kpi_id().as_str(),
                scope.claim_id().map(ClaimId::as_str),
            ],
            |row| row.get(0),
        )
        .optional()?;
    Ok(rowid)
}

fn fetch_credit(
    conn: &Connection,
    tenant: &TenantId,
    rowid: i64,
) -> Result<Option<Credit>, LedgerError> {
    let mut stmt = conn.prepare_cached(
        "SELECT donor_id, kpi_id, kpi_update_id, credited_value
         FROM donor_credits WHERE id = ?1 AND user_id = ?2",
    )?;
    let row = stmt
        .query_row(params![rowid, tenant.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })
        .optional()?;
    let Some((donor_id, kpi_id, kpi_update_id, credited_value)) = row else {
        return Ok(None);
    };
    Ok(Some(Credit {
        id: credit_id_from_rowid(rowid)?,
        tenant: tenant.clone(),
        donor_id: DonorId::parse(&donor_id).map_err(store_corrupt)?,
        kpi_id: KpiId::parse(&kpi_id).map_err(store_corrupt)?,
        kpi_update_id: kpi_update_id
            .as_deref()
            .map(ClaimId::parse)
            .transpose()
            .map_err(store_corrupt)?,
        credited_value: Amount::parse(credited_value).map_err(store_corrupt)?,
    }))
}

fn joined_rows(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
    tenant: &TenantId,
) -> Result<Vec<CreditJoined>, LedgerError> {
    let sql = format!(
        "SELECT c.id, c.donor_id, c.kpi_id, c.kpi_update_id, c.credited_value,
                d.name, d.email, k.title, k.unit, k.category,
                u.value, u.date_represented
         FROM donor_credits c
         JOIN donors d ON d.id = c.donor_id
         JOIN kpis k ON k.id = c.kpi_id
         LEFT JOIN kpi_updates u ON u.id = c.kpi_update_id
         WHERE c.user_id = ?1 AND {filter}
         ORDER BY c.id"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
                row.get::<_, String>(9)?,
                row.get::<_, Option<f64>>(10)?,
                row.get::<_, Option<String>>(11)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity(rows.len());
    for (
        rowid,
        donor_id,
        kpi_id,
        kpi_update_id,
        credited_value,
        donor_name,
        donor_email,
        kpi_title,
        kpi_unit,
        kpi_category,
        claim_value,
        claim_date,
    ) in rows
    {
        let donor_id = DonorId::parse(&donor_id).map_err(store_corrupt)?;
        let kpi_id = KpiId::parse(&kpi_id).map_err(store_corrupt)?;
        let kpi_update_id = kpi_update_id
            .as_deref()
            .map(ClaimId::parse)
            .transpose()
            .map_err(store_corrupt)?;
        let claim = match (&kpi_update_id, claim_value) {
            (Some(claim_id), Some(value)) => Some(ClaimSummary {
                id: claim_id.clone(),
                value: Amount::parse(value).map_err(store_corrupt)?,
                date_represented: claim_date
                    .as_deref()
                    .map(Datestamp::parse)
                    .transpose()
                    .unwrap_or_default(),
            }),
            _ => None,
        };
        out.push(CreditJoined {
            credit: Credit {
                id: credit_id_from_rowid(rowid)?,
                tenant: tenant.clone(),
                donor_id: donor_id.clone(),
                kpi_id: kpi_id.clone(),
                kpi_update_id,
                credited_value: Amount::parse(credited_value).map_err(store_corrupt)?,
            },
            donor: DonorSummary {
                id: donor_id,
                name: donor_name,
                email: donor_email,
            },
            kpi: KpiSummary {
                id: kpi_id,
                title: kpi_title,
                unit: kpi_unit,
                category: KpiCategory::parse(&kpi_category).map_err(store_corrupt)?,
            },
            claim,
        })
    }
    Ok(out)
}

/// Credit identifiers are stringified rowids; anything non-numeric
/// cannot name a row.
fn credit_rowid(id: &CreditId) -> Result<i64, LedgerError> {
    id.as_str()
        .parse::<i64>()
        .map_err(|_| LedgerError::NotFound("credit"))
}

fn store_corrupt(e: loma_impact_model::ParseError) -> LedgerError {
    LedgerError::Store(format!("corrupt row: {e}"))
}
