// SPDX-License-Identifier: Apache-2.0

use crate::error::LedgerError;
use rusqlite::Connection;

/// Per-connection pragmas. Foreign keys are connection-scoped in SQLite
/// and must be re-enabled on every open.
pub(crate) fn apply_connection_pragmas(
    conn: &Connection,
    busy_timeout_ms: u64,
) -> Result<(), LedgerError> {
    conn.execute_batch(&format!(
        "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout={busy_timeout_ms};",
    ))?;
    Ok(())
}

/// Idempotent schema bootstrap.
///
/// `donor_credits.id` is an AUTOINCREMENT rowid so credit identifiers
/// are never reused across deletes; the two partial unique indexes
/// enforce at most one credit row per (donor, scope) pair.
pub(crate) fn init_schema(conn: &Connection) -> Result<(), LedgerError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kpis (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            initiative_id TEXT NOT NULL,
            title TEXT NOT NULL,
            unit TEXT NOT NULL,
            category TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_kpis_tenant ON kpis(user_id);

        CREATE TABLE IF NOT EXISTS kpi_updates (
            id TEXT PRIMARY KEY,
            kpi_id TEXT NOT NULL REFERENCES kpis(id) ON DELETE CASCADE,
            value REAL NOT NULL CHECK (value >= 0),
            date_represented TEXT,
            date_range_start TEXT,
            date_range_end TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_kpi_updates_kpi ON kpi_updates(kpi_id);

        CREATE TABLE IF NOT EXISTS evidence (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            kpi_id TEXT REFERENCES kpis(id) ON DELETE SET NULL,
            date_represented TEXT,
            date_range_start TEXT,
            date_range_end TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_evidence_kpi ON evidence(kpi_id);

        CREATE TABLE IF NOT EXISTS evidence_claims (
            evidence_id TEXT NOT NULL REFERENCES evidence(id) ON DELETE CASCADE,
            kpi_update_id TEXT NOT NULL REFERENCES kpi_updates(id) ON DELETE CASCADE,
            PRIMARY KEY (evidence_id, kpi_update_id)
        );
        CREATE INDEX IF NOT EXISTS idx_evidence_claims_claim
            ON evidence_claims(kpi_update_id);

        CREATE TABLE IF NOT EXISTS donors (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            initiative_id TEXT NOT NULL,
            name TEXT NOT NULL,
            email TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_donors_tenant ON donors(user_id);

        CREATE TABLE IF NOT EXISTS donor_credits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            donor_id TEXT NOT NULL REFERENCES donors(id) ON DELETE CASCADE,
            kpi_id TEXT NOT NULL REFERENCES kpis(id) ON DELETE CASCADE,
            kpi_update_id TEXT REFERENCES kpi_updates(id) ON DELETE CASCADE,
            credited_value REAL NOT NULL CHECK (credited_value >= 0)
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_donor_credits_metric
            ON donor_credits(donor_id, kpi_id) WHERE kpi_update_id IS NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS idx_donor_credits_claim
            ON donor_credits(donor_id, kpi_update_id) WHERE kpi_update_id IS NOT NULL;
        CREATE INDEX IF NOT EXISTS idx_donor_credits_scope
            ON donor_credits(kpi_id, kpi_update_id);",
    )?;
    Ok(())
}
