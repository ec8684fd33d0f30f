// SPDX-License-Identifier: Apache-2.0

//! Cross-tenant access must read as absence, never as a permission
//! denial that leaks existence.

use loma_impact_ledger::{CreditLedger, CreditPatch, LedgerError, NewCredit, SqliteStore};
use loma_impact_model::{
    Amount, Claim, ClaimId, Credit, CreditScope, Donor, DonorId, InitiativeId, Kpi, KpiCategory,
    KpiId, TenantId,
};

fn amount(v: f64) -> Amount {
    Amount::parse(v).expect("amount")
}

fn seed() -> (SqliteStore, CreditLedger, TenantId, TenantId, Credit) {
    let store = SqliteStore::open_in_memory().expect("store");
    let owner = TenantId::parse("org-1").expect("tenant");
    let outsider = TenantId::parse("org-2").expect("tenant");
    store
        .insert_kpi(&Kpi {
            id: KpiId::parse("k1").expect("id"),
            tenant: owner.clone(),
            initiative_id: InitiativeId::parse("i1").expect("id"),
            title: "Wells drilled".to_string(),
            unit: "wells".to_string(),
            category: KpiCategory::Output,
        })
        .expect("kpi");
    store
        .insert_claim(
            &owner,
            &Claim::new(
                ClaimId::parse("u1").expect("id"),
                KpiId::parse("k1").expect("id"),
                amount(100.0),
                None,
                None,
            ),
        )
        .expect("claim");
    store
        .insert_donor(&Donor {
            id: DonorId::parse("d1").expect("id"),
            tenant: owner.clone(),
            initiative_id: InitiativeId::parse("i1").expect("id"),
            name: "Ada".to_string(),
            email: "ada@example.org".to_string(),
        })
        .expect("donor");
    let ledger = store.ledger();
    let credit = ledger
        .create(
            &owner,
            &NewCredit {
                donor_id: DonorId::parse("d1").expect("id"),
                kpi_id: KpiId::parse("k1").expect("id"),
                kpi_update_id: None,
                credited_value: amount(40.0),
            },
        )
        .expect("credit");
    (store, ledger, owner, outsider, credit)
}

#[test]
fn foreign_lists_are_not_found() {
    let (store, ledger, owner, outsider, _credit) = seed();
    assert!(store
        .get_donor(&outsider, &DonorId::parse("d1").expect("id"))
        .expect("get donor")
        .is_none());
    assert!(store
        .get_donor(&owner, &DonorId::parse("d1").expect("id"))
        .expect("get donor")
        .is_some());
    assert_eq!(
        ledger
            .list_for_donor(&outsider, &DonorId::parse("d1").expect("id"))
            .expect_err("foreign donor"),
        LedgerError::NotFound("donor")
    );
    assert_eq!(
        ledger
            .list_for_kpi(&outsider, &KpiId::parse("k1").expect("id"))
            .expect_err("foreign kpi"),
        LedgerError::NotFound("kpi")
    );
}

#[test]
fn foreign_writes_are_not_found() {
    let (_store, ledger, owner, outsider, credit) = seed();

    assert_eq!(
        ledger
            .update(
                &outsider,
                &credit.id,
                &CreditPatch {
                    credited_value: amount(10.0),
                    scope: None,
                },
            )
            .expect_err("foreign update"),
        LedgerError::NotFound("credit")
    );
    assert_eq!(
        ledger
            .delete(&outsider, &credit.id)
            .expect_err("foreign delete"),
        LedgerError::NotFound("credit")
    );
    assert_eq!(
        ledger
            .create(
                &outsider,
                &NewCredit {
                    donor_id: DonorId::parse("d1").expect("id"),
                    kpi_id: KpiId::parse("k1").expect("id"),
                    kpi_update_id: None,
                    credited_value: amount(1.0),
                },
            )
            .expect_err("foreign create"),
        LedgerError::NotFound("donor")
    );

    // The owner still sees an untouched row.
    let rows = ledger
        .list_for_donor(&owner, &DonorId::parse("d1").expect("id"))
        .expect("owner list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].credit.credited_value.value(), 40.0);
}

#[test]
fn foreign_availability_is_not_found() {
    let (_store, ledger, owner, outsider, _credit) = seed();
    let scope = CreditScope::from_parts(KpiId::parse("k1").expect("id"), None);
    assert_eq!(
        ledger
            .availability(&outsider, &scope, None)
            .expect_err("foreign availability"),
        LedgerError::NotFound("kpi")
    );
    let availability = ledger.availability(&owner, &scope, None).expect("owner");
    assert_eq!(availability.ceiling, 100.0);
    assert_eq!(availability.already_credited, 40.0);
    assert_eq!(availability.available, 60.0);
}

#[test]
fn foreign_credits_never_pollute_totals() {
    let (store, ledger, owner, outsider, _credit) = seed();
    // Outsider builds an identically-named world.
    store
        .insert_kpi(&Kpi {
            id: KpiId::parse("k2").expect("id"),
            tenant: outsider.clone(),
            initiative_id: InitiativeId::parse("i9").expect("id"),
            title: "Wells drilled".to_string(),
            unit: "wells".to_string(),
            category: KpiCategory::Output,
        })
        .expect("kpi");
    let scope = CreditScope::from_parts(KpiId::parse("k1").expect("id"), None);
    let total = ledger.total_for_scope(&owner, &scope, None).expect("total");
    assert_eq!(total, 40.0);
}
