// SPDX-License-Identifier: Apache-2.0

use loma_impact_ledger::{NewCredit, SqliteStore};
use loma_impact_model::{
    Amount, Claim, ClaimId, Donor, DonorId, InitiativeId, Kpi, KpiCategory, KpiId, TenantId,
};

#[test]
fn ledger_state_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("impact.sqlite3");
    let tenant = TenantId::parse("org-1").expect("tenant");

    {
        let store = SqliteStore::open(&db_path).expect("open");
        store
            .insert_kpi(&Kpi {
                id: KpiId::parse("k1").expect("id"),
                tenant: tenant.clone(),
                initiative_id: InitiativeId::parse("i1").expect("id"),
                title: "Wells drilled".to_string(),
                unit: "wells".to_string(),
                category: KpiCategory::Output,
            })
            .expect("kpi");
        store
            .insert_claim(
                &tenant,
                &Claim::new(
                    ClaimId::parse("u1").expect("id"),
                    KpiId::parse("k1").expect("id"),
                    Amount::parse(100.0).expect("amount"),
                    None,
                    None,
                ),
            )
            .expect("claim");
        store
            .insert_donor(&Donor {
                id: DonorId::parse("d1").expect("id"),
                tenant: tenant.clone(),
                initiative_id: InitiativeId::parse("i1").expect("id"),
                name: "Ada".to_string(),
                email: "ada@example.org".to_string(),
            })
            .expect("donor");
        store
            .ledger()
            .create(
                &tenant,
                &NewCredit {
                    donor_id: DonorId::parse("d1").expect("id"),
                    kpi_id: KpiId::parse("k1").expect("id"),
                    kpi_update_id: None,
                    credited_value: Amount::parse(40.0).expect("amount"),
                },
            )
            .expect("credit");
    }

    let reopened = SqliteStore::open(&db_path).expect("reopen");
    let rows = reopened
        .ledger()
        .list_for_donor(&tenant, &DonorId::parse("d1").expect("id"))
        .expect("list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].credit.credited_value.value(), 40.0);
    assert_eq!(rows[0].kpi.title, "Wells drilled");

    // Schema bootstrap is idempotent; the reopen above already proved
    // it ran twice against the same file.
    reopened.ping().expect("ping");
}
