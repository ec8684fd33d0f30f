// SPDX-License-Identifier: Apache-2.0

use loma_impact_ledger::{CreditLedger, LedgerError, NewCredit, SqliteStore};
use loma_impact_model::{
    Amount, Claim, ClaimId, CreditScope, Donor, DonorId, InitiativeId, Kpi, KpiCategory, KpiId,
    TenantId,
};

fn amount(v: f64) -> Amount {
    Amount::parse(v).expect("amount")
}

fn tenant() -> TenantId {
    TenantId::parse("org-1").expect("tenant")
}

fn seed() -> (SqliteStore, CreditLedger) {
    let store = SqliteStore::open_in_memory().expect("store");
    let t = tenant();
    store
        .insert_kpi(&Kpi {
            id: KpiId::parse("k1").expect("id"),
            tenant: t.clone(),
            initiative_id: InitiativeId::parse("i1").expect("id"),
            title: "Households reached".to_string(),
            unit: "households".to_string(),
            category: KpiCategory::Impact,
        })
        .expect("kpi");
    for (id, value) in [("u1", 100.0), ("u2", 100.0)] {
        store
            .insert_claim(
                &t,
                &Claim::new(
                    ClaimId::parse(id).expect("id"),
                    KpiId::parse("k1").expect("id"),
                    amount(value),
                    None,
                    None,
                ),
            )
            .expect("claim");
    }
    for donor in ["donor-a", "donor-b"] {
        store
            .insert_donor(&Donor {
                id: DonorId::parse(donor).expect("id"),
                tenant: t.clone(),
                initiative_id: InitiativeId::parse("i1").expect("id"),
                name: donor.to_string(),
                email: format!("{donor}@example.org"),
            })
            .expect("donor");
    }
    let ledger = store.ledger();
    (store, ledger)
}

fn metric_scope() -> CreditScope {
    CreditScope::from_parts(KpiId::parse("k1").expect("id"), None)
}

fn claim_scope(claim: &str) -> CreditScope {
    CreditScope::from_parts(
        KpiId::parse("k1").expect("id"),
        Some(ClaimId::parse(claim).expect("id")),
    )
}

#[test]
fn shrinking_a_claim_caps_its_credits_proportionally() {
    let (store, ledger) = seed();
    let t = tenant();
    ledger
        .create(
            &t,
            &NewCredit {
                donor_id: DonorId::parse("donor-a").expect("id"),
                kpi_id: KpiId::parse("k1").expect("id"),
                kpi_update_id: Some(ClaimId::parse("u1").expect("id")),
                credited_value: amount(60.0),
            },
        )
        .expect("A 60");
    ledger
        .create(
            &t,
            &NewCredit {
                donor_id: DonorId::parse("donor-b").expect("id"),
                kpi_id: KpiId::parse("k1").expect("id"),
                kpi_update_id: Some(ClaimId::parse("u1").expect("id")),
                credited_value: amount(40.0),
            },
        )
        .expect("B 40");

    // Claim shrinks 100 -> 50; both credits scale by half.
    let report = store
        .update_claim_value(&t, &ClaimId::parse("u1").expect("id"), amount(50.0))
        .expect("shrink");
    assert_eq!(report.capped.len(), 2);
    assert!(report.removed.is_empty());
    let by_donor: Vec<(f64, f64)> = report
        .capped
        .iter()
        .map(|c| (c.previous_value, c.new_value))
        .collect();
    assert!(by_donor.contains(&(60.0, 30.0)));
    assert!(by_donor.contains(&(40.0, 20.0)));

    let claim_total = ledger
        .total_for_scope(&t, &claim_scope("u1"), None)
        .expect("claim total");
    assert_eq!(claim_total, 50.0);
}

#[test]
fn growing_a_claim_touches_nothing() {
    let (store, ledger) = seed();
    let t = tenant();
    ledger
        .create(
            &t,
            &NewCredit {
                donor_id: DonorId::parse("donor-a").expect("id"),
                kpi_id: KpiId::parse("k1").expect("id"),
                kpi_update_id: Some(ClaimId::parse("u1").expect("id")),
                credited_value: amount(60.0),
            },
        )
        .expect("A 60");
    let report = store
        .update_claim_value(&t, &ClaimId::parse("u1").expect("id"), amount(150.0))
        .expect("grow");
    assert!(report.is_noop());
    let total = ledger
        .total_for_scope(&t, &claim_scope("u1"), None)
        .expect("total");
    assert_eq!(total, 60.0);
}

#[test]
fn shrinking_the_measured_total_caps_metric_credits() {
    let (store, ledger) = seed();
    let t = tenant();
    ledger
        .create(
            &t,
            &NewCredit {
                donor_id: DonorId::parse("donor-a").expect("id"),
                kpi_id: KpiId::parse("k1").expect("id"),
                kpi_update_id: None,
                credited_value: amount(200.0),
            },
        )
        .expect("A fills the metric pool");

    // Measured total 200 -> 100 once u2 is gone.
    let report = store
        .delete_claim(&t, &ClaimId::parse("u2").expect("id"))
        .expect("delete claim");
    assert_eq!(report.capped.len(), 1);
    assert_eq!(report.capped[0].previous_value, 200.0);
    assert_eq!(report.capped[0].new_value, 100.0);

    let metric_total = ledger
        .total_for_scope(&t, &metric_scope(), None)
        .expect("metric total");
    assert_eq!(metric_total, 100.0);
}

#[test]
fn deleting_a_claim_removes_its_credits() {
    let (store, ledger) = seed();
    let t = tenant();
    let credit = ledger
        .create(
            &t,
            &NewCredit {
                donor_id: DonorId::parse("donor-a").expect("id"),
                kpi_id: KpiId::parse("k1").expect("id"),
                kpi_update_id: Some(ClaimId::parse("u1").expect("id")),
                credited_value: amount(75.0),
            },
        )
        .expect("A 75");

    let report = store
        .delete_claim(&t, &ClaimId::parse("u1").expect("id"))
        .expect("delete claim");
    assert_eq!(report.removed, vec![credit.id.clone()]);

    let err = ledger.delete(&t, &credit.id).expect_err("row is gone");
    assert_eq!(err, LedgerError::NotFound("credit"));
}

#[test]
fn reconcile_kpi_is_a_noop_on_a_consistent_ledger() {
    let (_store, ledger) = seed();
    let t = tenant();
    ledger
        .create(
            &t,
            &NewCredit {
                donor_id: DonorId::parse("donor-a").expect("id"),
                kpi_id: KpiId::parse("k1").expect("id"),
                kpi_update_id: None,
                credited_value: amount(120.0),
            },
        )
        .expect("A 120");
    let report = ledger
        .reconcile_kpi(&t, &KpiId::parse("k1").expect("id"))
        .expect("reconcile");
    assert!(report.is_noop());
}

#[test]
fn reconcile_kpi_requires_an_owned_kpi() {
    let (_store, ledger) = seed();
    let outsider = TenantId::parse("org-2").expect("tenant");
    let err = ledger
        .reconcile_kpi(&outsider, &KpiId::parse("k1").expect("id"))
        .expect_err("foreign kpi");
    assert_eq!(err, LedgerError::NotFound("kpi"));
}

#[test]
fn post_condition_no_scope_exceeds_its_ceiling_after_repair() {
    let (store, ledger) = seed();
    let t = tenant();
    ledger
        .create(
            &t,
            &NewCredit {
                donor_id: DonorId::parse("donor-a").expect("id"),
                kpi_id: KpiId::parse("k1").expect("id"),
                kpi_update_id: None,
                credited_value: amount(170.0),
            },
        )
        .expect("metric credit");
    ledger
        .create(
            &t,
            &NewCredit {
                donor_id: DonorId::parse("donor-b").expect("id"),
                kpi_id: KpiId::parse("k1").expect("id"),
                kpi_update_id: Some(ClaimId::parse("u1").expect("id")),
                credited_value: amount(90.0),
            },
        )
        .expect("claim credit");

    store
        .update_claim_value(&t, &ClaimId::parse("u1").expect("id"), amount(30.0))
        .expect("shrink claim");

    let metric_total = ledger
        .total_for_scope(&t, &metric_scope(), None)
        .expect("metric total");
    let claim_total = ledger
        .total_for_scope(&t, &claim_scope("u1"), None)
        .expect("claim total");
    // New measured total: 30 + 100 = 130; new claim ceiling: 30.
    assert!(metric_total <= 130.0, "metric scope over ceiling: {metric_total}");
    assert!(claim_total <= 30.0, "claim scope over ceiling: {claim_total}");
}
