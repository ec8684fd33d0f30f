// SPDX-License-Identifier: Apache-2.0

use crate::error::LedgerError;
use crate::ledger::CreditLedger;
use crate::reconcile::{self, ReconcileReport};
use crate::store::{schema, ClaimStore, EvidenceStore};
use loma_impact_model::{
    Amount, Claim, ClaimId, DateSpan, Datestamp, Donor, DonorId, Evidence, EvidenceId,
    InitiativeId, Kpi, KpiCategory, KpiId, ParseError, TenantId,
};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// SQLite-backed store for the whole subsystem.
///
/// One serialized connection; the credit ledger obtained from
/// [`SqliteStore::ledger`] shares it, so credit validation and claim
/// mutation see a single consistent database.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        Self::open_with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT_MS)
    }

    pub fn open_with_busy_timeout(path: &Path, busy_timeout_ms: u64) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)?;
        Self::bootstrap(conn, busy_timeout_ms)
    }

    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        Self::bootstrap(conn, DEFAULT_BUSY_TIMEOUT_MS)
    }

    fn bootstrap(conn: Connection, busy_timeout_ms: u64) -> Result<Self, LedgerError> {
        schema::apply_connection_pragmas(&conn, busy_timeout_ms)?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Credit ledger sharing this store's connection.
    #[must_use]
    pub fn ledger(&self) -> CreditLedger {
        CreditLedger::new(Arc::clone(&self.conn))
    }

    /// Cheap store liveness probe for readiness checks.
    pub fn ping(&self) -> Result<(), LedgerError> {
        let conn = lock(&self.conn)?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    pub fn insert_kpi(&self, kpi: &Kpi) -> Result<(), LedgerError> {
        kpi.validate()?;
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO kpis (id, user_id, initiative_id, title, unit, category)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                kpi.id.as_str(),
                kpi.tenant.as_str(),
                kpi.initiative_id.as_str(),
                kpi.title,
                kpi.unit,
                kpi.category.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn insert_donor(&self, donor: &Donor) -> Result<(), LedgerError> {
        donor.validate()?;
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO donors (id, user_id, initiative_id, name, email)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                donor.id.as_str(),
                donor.tenant.as_str(),
                donor.initiative_id.as_str(),
                donor.name,
                donor.email,
            ],
        )?;
        Ok(())
    }

    pub fn insert_claim(&self, tenant: &TenantId, claim: &Claim) -> Result<(), LedgerError> {
        let conn = lock(&self.conn)?;
        if fetch_kpi(&conn, tenant, &claim.kpi_id)?.is_none() {
            return Err(LedgerError::NotFound("kpi"));
        }
        conn.execute(
            "INSERT INTO kpi_updates
                 (id, kpi_id, value, date_represented, date_range_start, date_range_end)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                claim.id.as_str(),
                claim.kpi_id.as_str(),
                claim.value.value(),
                claim.date_represented.as_ref().map(Datestamp::as_str),
                claim.date_range.as_ref().map(|s| s.start.as_str()),
                claim.date_range.as_ref().map(|s| s.end.as_str()),
            ],
        )?;
        Ok(())
    }

    pub fn insert_evidence(
        &self,
        tenant: &TenantId,
        evidence: &Evidence,
        coarse_kpi: Option<&KpiId>,
    ) -> Result<(), LedgerError> {
        evidence.validate()?;
        let conn = lock(&self.conn)?;
        if let Some(kpi_id) = coarse_kpi {
            if fetch_kpi(&conn, tenant, kpi_id)?.is_none() {
                return Err(LedgerError::NotFound("kpi"));
            }
        }
        conn.execute(
            "INSERT INTO evidence
                 (id, user_id, kind, kpi_id, date_represented, date_range_start, date_range_end)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                evidence.id.as_str(),
                tenant.as_str(),
                evidence.kind,
                coarse_kpi.map(KpiId::as_str),
                evidence.date_represented.as_ref().map(Datestamp::as_str),
                evidence.date_range.as_ref().map(|s| s.start.as_str()),
                evidence.date_range.as_ref().map(|s| s.end.as_str()),
            ],
        )?;
        Ok(())
    }

    pub fn link_evidence_to_claim(
        &self,
        tenant: &TenantId,
        evidence_id: &EvidenceId,
        claim_id: &ClaimId,
    ) -> Result<(), LedgerError> {
        let conn = lock(&self.conn)?;
        let owned: Option<String> = conn
            .query_row(
                "SELECT id FROM evidence WHERE id = ?1 AND user_id = ?2",
                params![evidence_id.as_str(), tenant.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Err(LedgerError::NotFound("evidence"));
        }
        if fetch_claim(&conn, tenant, claim_id)?.is_none() {
            return Err(LedgerError::NotFound("kpi update"));
        }
        conn.execute(
            "INSERT OR IGNORE INTO evidence_claims (evidence_id, kpi_update_id)
             VALUES (?1, ?2)",
            params![evidence_id.as_str(), claim_id.as_str()],
        )?;
        Ok(())
    }

    /// Change a claim's measured value, repairing dependent credits in
    /// the same transaction. Post-condition: neither the claim scope nor
    /// the KPI's metric scope exceeds its ceiling.
    pub fn update_claim_value(
        &self,
        tenant: &TenantId,
        claim_id: &ClaimId,
        new_value: Amount,
    ) -> Result<ReconcileReport, LedgerError> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let claim = fetch_claim(&tx, tenant, claim_id)?.ok_or(LedgerError::NotFound("kpi update"))?;
        tx.execute(
            "UPDATE kpi_updates SET value = ?1 WHERE id = ?2",
            params![new_value.value(), claim_id.as_str()],
        )?;
        let mut report = reconcile::reconcile_claim_scope(&tx, tenant, &claim.kpi_id, claim_id)?;
        report.merge(reconcile::reconcile_metric_scope(&tx, tenant, &claim.kpi_id)?);
        tx.commit()?;
        Ok(report)
    }

    /// Remove a claim. Its claim-level credits are removed with it and
    /// the KPI's metric-level credits are capped to the shrunken total.
    pub fn delete_claim(
        &self,
        tenant: &TenantId,
        claim_id: &ClaimId,
    ) -> Result<ReconcileReport, LedgerError> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let claim = fetch_claim(&tx, tenant, claim_id)?.ok_or(LedgerError::NotFound("kpi update"))?;
        let mut report = reconcile::remove_claim_credits(&tx, claim_id)?;
        tx.execute(
            "DELETE FROM kpi_updates WHERE id = ?1",
            params![claim_id.as_str()],
        )?;
        report.merge(reconcile::reconcile_metric_scope(&tx, tenant, &claim.kpi_id)?);
        tx.commit()?;
        Ok(report)
    }

    pub fn get_kpi(&self, tenant: &TenantId, id: &KpiId) -> Result<Option<Kpi>, LedgerError> {
        let conn = lock(&self.conn)?;
        fetch_kpi(&conn, tenant, id)
    }

    pub fn get_donor(&self, tenant: &TenantId, id: &DonorId) -> Result<Option<Donor>, LedgerError> {
        let conn = lock(&self.conn)?;
        fetch_donor(&conn, tenant, id)
    }
}

impl ClaimStore for SqliteStore {
    fn list_claims_for_kpi(
        &self,
        tenant: &TenantId,
        kpi_id: &KpiId,
    ) -> Result<Vec<Claim>, LedgerError> {
        let conn = lock(&self.conn)?;
        if fetch_kpi(&conn, tenant, kpi_id)?.is_none() {
            return Ok(Vec::new());
        }
        fetch_claims_for_kpi(&conn, kpi_id)
    }

    fn get_claim(&self, tenant: &TenantId, id: &ClaimId) -> Result<Option<Claim>, LedgerError> {
        let conn = lock(&self.conn)?;
        fetch_claim(&conn, tenant, id)
    }
}

impl EvidenceStore for SqliteStore {
    fn list_evidence_for_kpi(
        &self,
        tenant: &TenantId,
        kpi_id: &KpiId,
    ) -> Result<Vec<Evidence>, LedgerError> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare_cached(
            "SELECT DISTINCT e.id, e.kind, e.date_represented, e.date_range_start, e.date_range_end
             FROM evidence e
             LEFT JOIN evidence_claims ec ON ec.evidence_id = e.id
             LEFT JOIN kpi_updates u ON u.id = ec.kpi_update_id
             WHERE e.user_id = ?1 AND (e.kpi_id = ?2 OR u.kpi_id = ?2)
             ORDER BY e.id",
        )?;
        let rows = stmt.query_map(params![tenant.as_str(), kpi_id.as_str()], evidence_row)?;
        collect_evidence(rows)
    }

    fn list_evidence_for_claim(
        &self,
        tenant: &TenantId,
        claim_id: &ClaimId,
    ) -> Result<Vec<Evidence>, LedgerError> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare_cached(
            "SELECT e.id, e.kind, e.date_represented, e.date_range_start, e.date_range_end
             FROM evidence e
             JOIN evidence_claims ec ON ec.evidence_id = e.id
             WHERE e.user_id = ?1 AND ec.kpi_update_id = ?2
             ORDER BY e.id",
        )?;
        let rows = stmt.query_map(params![tenant.as_str(), claim_id.as_str()], evidence_row)?;
        collect_evidence(rows)
    }
}

type EvidenceCells = (String, String, Option<String>, Option<String>, Option<String>);

fn evidence_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EvidenceCells> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn collect_evidence(
    rows: impl Iterator<Item = rusqlite::Result<EvidenceCells>>,
) -> Result<Vec<Evidence>, LedgerError> {
    let mut out = Vec::new();
    for row in rows {
        let (id, kind, date, start, end) = row?;
        out.push(Evidence {
            id: EvidenceId::parse(&id).map_err(corrupt)?,
            kind,
            date_represented: date_cell(date.as_deref(), "evidence", &id),
            date_range: span_cells(start.as_deref(), end.as_deref(), "evidence", &id),
        });
    }
    Ok(out)
}

pub(crate) fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, LedgerError> {
    conn.lock()
        .map_err(|_| LedgerError::Store("connection mutex poisoned".to_string()))
}

fn corrupt(e: ParseError) -> LedgerError {
    LedgerError::Store(format!("corrupt row: {e}"))
}

/// A malformed stored date is treated as absent for matching purposes;
/// a row must never silently match everything.
fn date_cell(raw: Option<&str>, table: &str, id: &str) -> Option<Datestamp> {
    let raw = raw?;
    match Datestamp::parse(raw) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(table, id, error = %e, "ignoring malformed stored date");
            None
        }
    }
}

fn span_cells(
    start: Option<&str>,
    end: Option<&str>,
    table: &str,
    id: &str,
) -> Option<DateSpan> {
    match (start, end) {
        (Some(start), Some(end)) => {
            let start = date_cell(Some(start), table, id)?;
            let end = date_cell(Some(end), table, id)?;
            match DateSpan::new(start, end) {
                Ok(span) => Some(span),
                Err(e) => {
                    warn!(table, id, error = %e, "ignoring inverted stored date range");
                    None
                }
            }
        }
        (None, None) => None,
        _ => {
            warn!(table, id, "ignoring half-open stored date range");
            None
        }
    }
}

pub(crate) fn fetch_kpi(
    conn: &Connection,
    tenant: &TenantId,
    id: &KpiId,
) -> Result<Option<Kpi>, LedgerError> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, user_id, initiative_id, title, unit, category
         FROM kpis WHERE id = ?1 AND user_id = ?2",
    )?;
    let row = stmt
        .query_row(params![id.as_str(), tenant.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })
        .optional()?;
    let Some((id, user_id, initiative_id, title, unit, category)) = row else {
        return Ok(None);
    };
    Ok(Some(Kpi {
        id: KpiId::parse(&id).map_err(corrupt)?,
        tenant: TenantId::parse(&user_id).map_err(corrupt)?,
        initiative_id: InitiativeId::parse(&initiative_id).map_err(corrupt)?,
        title,
        unit,
        category: KpiCategory::parse(&category).map_err(corrupt)?,
    }))
}

pub(crate) fn fetch_claim(
    conn: &Connection,
    tenant: &TenantId,
    id: &ClaimId,
) -> Result<Option<Claim>, LedgerError> {
    let mut stmt = conn.prepare_cached(
        "SELECT u.id, u.kpi_id, u.value, u.date_represented, u.date_range_start, u.date_range_end
         FROM kpi_updates u
         JOIN kpis k ON k.id = u.kpi_id
         WHERE u.id = ?1 AND k.user_id = ?2",
    )?;
    let row = stmt
        .query_row(params![id.as_str(), tenant.as_str()], claim_row)
        .optional()?;
    row.map(claim_from_cells).transpose()
}

pub(crate) fn fetch_claims_for_kpi(
    conn: &Connection,
    kpi_id: &KpiId,
) -> Result<Vec<Claim>, LedgerError> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, kpi_id, value, date_represented, date_range_start, date_range_end
         FROM kpi_updates WHERE kpi_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![kpi_id.as_str()], claim_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(claim_from_cells(row?)?);
    }
    Ok(out)
}

type ClaimCells = (
    String,
    String,
    f64,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn claim_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClaimCells> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn claim_from_cells(cells: ClaimCells) -> Result<Claim, LedgerError> {
    let (id, kpi_id, value, date, start, end) = cells;
    Ok(Claim::new(
        ClaimId::parse(&id).map_err(corrupt)?,
        KpiId::parse(&kpi_id).map_err(corrupt)?,
        Amount::parse(value).map_err(corrupt)?,
        date_cell(date.as_deref(), "kpi_updates", &id),
        span_cells(start.as_deref(), end.as_deref(), "kpi_updates", &id),
    ))
}

pub(crate) fn fetch_donor(
    conn: &Connection,
    tenant: &TenantId,
    id: &DonorId,
) -> Result<Option<Donor>, LedgerError> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, user_id, initiative_id, name, email
         FROM donors WHERE id = ?1 AND user_id = ?2",
    )?;
    let row = stmt
        .query_row(params![id.as_str(), tenant.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })
        .optional()?;
    let Some((id, user_id, initiative_id, name, email)) = row else {
        return Ok(None);
    };
    Ok(Some(Donor {
        id: DonorId::parse(&id).map_err(corrupt)?,
        tenant: TenantId::parse(&user_id).map_err(corrupt)?,
        initiative_id: InitiativeId::parse(&initiative_id).map_err(corrupt)?,
        name,
        email,
    }))
}
