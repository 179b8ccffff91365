//! End-to-end PIX webhook behaviour against the in-memory ledger.

use std::sync::Arc;

use actix_web::{App, http::StatusCode, test, web};
use futures::future::join_all;
use rstest::rstest;
use serde_json::{Value, json};

use marketplace::domain::ports::PixWebhookCommand;
use marketplace::domain::{PixBatch, PixNotification, TransactionId};
use marketplace::inbound::http::{configure_api, configure_webhooks};

mod support;

use support::{Harness, session_middleware};

fn notification(txid: &str) -> Value {
    json!({
        "pix": [{
            "txid": txid,
            "valor": "49.90",
            "endToEndId": "E18236120202603021430s0123456789",
            "horario": "2026-03-02T14:29:51.000Z"
        }]
    })
}

macro_rules! init_app {
    ($harness:expr) => {
        test::init_service(
            App::new()
                .app_data($harness.http_state())
                .service(
                    web::scope("/api/v1")
                        .wrap(session_middleware())
                        .configure(configure_api),
                )
                .configure(configure_webhooks),
        )
        .await
    };
}

#[actix_web::test]
async fn repeated_delivery_records_one_payment() {
    let harness = Harness::new();
    let app = init_app!(harness);

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let request = test::TestRequest::post()
            .uri("/webhooks/pix")
            .set_json(notification("abc123"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = test::read_body_json(response).await;
        bodies.push(body);
    }

    assert_eq!(harness.ledger.len(), 1);
    assert_eq!(bodies[0]["recorded"], 1);
    assert_eq!(bodies[1]["recorded"], 0);
    assert_eq!(bodies[1]["duplicates"], 1);

    let stored = harness
        .ledger
        .get(&TransactionId::new("abc123").expect("valid txid"))
        .expect("payment recorded");
    assert_eq!(stored.amount.cents(), 4990);
}

#[actix_web::test]
async fn gateway_path_suffix_reaches_the_same_ledger() {
    let harness = Harness::new();
    let app = init_app!(harness);

    for uri in ["/webhooks/pix", "/webhooks/pix/pix"] {
        let request = test::TestRequest::post()
            .uri(uri)
            .set_json(notification("suffixed42"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(harness.ledger.len(), 1);
}

#[actix_web::test]
async fn duplicates_inside_one_batch_are_collapsed() {
    let harness = Harness::new();
    let app = init_app!(harness);
    let entry = notification("batch01")["pix"][0].clone();

    let request = test::TestRequest::post()
        .uri("/webhooks/pix")
        .set_json(json!({ "pix": [entry.clone(), entry] }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, request).await;

    assert_eq!(body["received"], 2);
    assert_eq!(body["recorded"], 1);
    assert_eq!(body["duplicates"], 1);
    assert_eq!(harness.ledger.len(), 1);
}

#[rstest]
#[case::missing_amount(json!({"txid": "bad1", "horario": "2026-03-02T14:29:51Z"}))]
#[case::negative_amount(json!({"txid": "bad1", "valor": "-1.00", "horario": "2026-03-02T14:29:51Z"}))]
#[case::bad_timestamp(json!({"txid": "bad1", "valor": "1.00", "horario": "yesterday"}))]
#[case::bad_txid(json!({"txid": "bad-1", "valor": "1.00", "horario": "2026-03-02T14:29:51Z"}))]
#[case::oversized_end_to_end_id(json!({
    "txid": "bad1",
    "valor": "1.00",
    "endToEndId": "E".repeat(65),
    "horario": "2026-03-02T14:29:51Z"
}))]
#[actix_web::test]
async fn invalid_entries_do_not_block_valid_ones(#[case] invalid: Value) {
    let harness = Harness::new();
    let app = init_app!(harness);
    let valid = notification("good1")["pix"][0].clone();
    let payload = json!({ "pix": [valid, invalid] });

    for attempt in 0..3 {
        let request = test::TestRequest::post()
            .uri("/webhooks/pix")
            .set_json(&payload)
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["received"], 2);
        assert_eq!(body["rejected"], 1);
        assert_eq!(body["recorded"], if attempt == 0 { 1 } else { 0 });
    }

    assert_eq!(harness.ledger.len(), 1);
    assert!(
        harness
            .ledger
            .get(&TransactionId::new("good1").expect("valid txid"))
            .is_some()
    );
}

#[rstest]
#[case::truncated("{\"pix\": [")]
#[case::not_json("not json")]
#[actix_web::test]
async fn unreadable_bodies_are_acknowledged(#[case] body: &'static str) {
    let harness = Harness::new();
    let app = init_app!(harness);

    let request = test::TestRequest::post()
        .uri("/webhooks/pix")
        .insert_header(("content-type", "application/json"))
        .set_payload(body)
        .to_request();
    let response = test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(harness.ledger.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deliveries_of_one_transaction_record_it_once() {
    let harness = Harness::new();
    let service = Arc::new(harness.pix_ledger_service());
    let entry = PixNotification::try_from_parts(
        "race42",
        "49.90",
        None,
        "2026-03-02T14:29:51Z",
        json!({"txid": "race42", "valor": "49.90"}),
    )
    .expect("valid notification");

    let deliveries = (0..8).map(|_| {
        let service = service.clone();
        let batch = PixBatch {
            notifications: vec![entry.clone()],
            rejected: 0,
        };
        tokio::spawn(async move { service.ingest(batch).await })
    });
    let receipts: Vec<_> = join_all(deliveries)
        .await
        .into_iter()
        .map(|joined| {
            joined
                .expect("task completes")
                .expect("delivery acknowledged")
        })
        .collect();

    assert_eq!(harness.ledger.len(), 1);
    assert_eq!(receipts.iter().map(|receipt| receipt.recorded).sum::<usize>(), 1);
    assert_eq!(receipts.iter().map(|receipt| receipt.duplicates).sum::<usize>(), 7);
}

#[actix_web::test]
async fn recorded_payment_is_visible_to_status_lookup() {
    let harness = Harness::new();
    let app = init_app!(harness);

    let lookup = |txid: &str| {
        test::TestRequest::get()
            .uri(&format!("/api/v1/pix/payments/{txid}"))
            .to_request()
    };

    let before = test::call_service(&app, lookup("lookup77")).await;
    assert_eq!(before.status(), StatusCode::NOT_FOUND);

    let request = test::TestRequest::post()
        .uri("/webhooks/pix")
        .set_json(notification("lookup77"))
        .to_request();
    test::call_service(&app, request).await;

    let after = test::call_service(&app, lookup("lookup77")).await;
    assert_eq!(after.status(), StatusCode::OK);
    let body: Value = test::read_body_json(after).await;
    assert_eq!(body["status"], "COMPLETED");
}
