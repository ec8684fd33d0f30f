// SPDX-License-Identifier: Apache-2.0

//! The JSON shapes here are the de facto contract with the
//! presentation layer; field names must never drift.

use loma_impact_api::{credit_dto, credit_row_dto, CreateCreditRequest};
use loma_impact_ledger::{ClaimSummary, CreditJoined, DonorSummary, KpiSummary};
use loma_impact_model::{
    Amount, ClaimId, Credit, CreditId, Datestamp, DonorId, KpiCategory, KpiId, TenantId,
};

fn credit() -> Credit {
    Credit {
        id: CreditId::parse("7").expect("id"),
        tenant: TenantId::parse("org-1").expect("id"),
        donor_id: DonorId::parse("d1").expect("id"),
        kpi_id: KpiId::parse("k1").expect("id"),
        kpi_update_id: Some(ClaimId::parse("u1").expect("id")),
        credited_value: Amount::parse(12.5).expect("amount"),
    }
}

#[test]
fn flat_row_shape_is_exact() {
    let dto = credit_row_dto(&credit());
    let value = serde_json::to_value(dto).expect("serialize");
    assert_eq!(
        value,
        serde_json::json!({
            "id": "7",
            "donor_id": "d1",
            "kpi_id": "k1",
            "kpi_update_id": "u1",
            "credited_value": 12.5
        })
    );
}

#[test]
fn joined_shape_nests_summaries() {
    let joined = CreditJoined {
        credit: credit(),
        donor: DonorSummary {
            id: DonorId::parse("d1").expect("id"),
            name: "Ada".to_string(),
            email: "ada@example.org".to_string(),
        },
        kpi: KpiSummary {
            id: KpiId::parse("k1").expect("id"),
            title: "Wells drilled".to_string(),
            unit: "wells".to_string(),
            category: KpiCategory::Output,
        },
        claim: Some(ClaimSummary {
            id: ClaimId::parse("u1").expect("id"),
            value: Amount::parse(80.0).expect("amount"),
            date_represented: Some(Datestamp::parse("2024-05-01").expect("date")),
        }),
    };
    let value = serde_json::to_value(credit_dto(&joined)).expect("serialize");
    assert_eq!(value["donor"]["email"], "ada@example.org");
    assert_eq!(value["kpi"]["category"], "output");
    assert_eq!(value["claim"]["value"], 80.0);
    assert_eq!(value["claim"]["date_represented"], "2024-05-01");
    assert_eq!(value["credited_value"], 12.5);
}

#[test]
fn metric_level_row_serializes_null_claim_reference() {
    let mut c = credit();
    c.kpi_update_id = None;
    let value = serde_json::to_value(credit_row_dto(&c)).expect("serialize");
    assert!(value["kpi_update_id"].is_null());
    assert!(value.get("claim").is_none());
}

#[test]
fn create_request_tolerates_unknown_fields() {
    let raw = r#"{
        "donor_id": "d1",
        "kpi_id": "k1",
        "credited_value": 3,
        "note": "sent by an older client"
    }"#;
    let body: CreateCreditRequest = serde_json::from_str(raw).expect("deserialize");
    assert_eq!(body.kpi_update_id, None);
    assert_eq!(body.credited_value, 3.0);
}
