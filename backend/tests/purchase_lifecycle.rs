//! Purchase entitlement lifecycle: creation from Stripe, submission, the
//! consumption race and moderator rejection.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, http::StatusCode, test, web};
use futures::future::join_all;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use marketplace::domain::ports::{PaymentEventCommand, PaymentEventOutcome, PurchaseCommand};
use marketplace::domain::{ErrorCode, Purchase, PurchaseType, SubmissionStatus};
use marketplace::inbound::http::{configure_api, configure_webhooks};

mod support;

use support::{Harness, session_middleware, sign_in, start_time, stripe_signature, user_id};

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

fn seed(harness: &Harness, status: SubmissionStatus) -> Purchase {
    let mut purchase = Purchase::available(
        user_id(),
        PurchaseType::ProductBoost,
        Some("prod_42".to_owned()),
        format!("cs_seed_{status:?}"),
        start_time(),
    );
    purchase.submission_status = status;
    harness.purchases.insert(purchase.clone());
    purchase
}

fn completed_checkout(session_id: &str) -> Vec<u8> {
    json!({
        "id": "evt_lifecycle",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": session_id,
            "mode": "payment",
            "payment_status": "paid",
            "metadata": {
                "userId": support::USER_ID,
                "purchaseType": "CAROUSEL_HIGHLIGHT",
                "productId": "prod_7"
            }
        }}
    })
    .to_string()
    .into_bytes()
}

#[rstest]
#[tokio::test]
async fn redelivered_checkout_creates_one_purchase(harness: Harness) {
    let state = harness.http_state();
    let payload = completed_checkout("cs_live_1");
    let signature = stripe_signature(start_time().timestamp(), &payload);

    let first = state
        .payment_events
        .handle_event(&payload, &signature)
        .await
        .expect("first delivery accepted");
    harness.clock.advance(Duration::from_secs(30));
    let second = state
        .payment_events
        .handle_event(&payload, &signature)
        .await
        .expect("redelivery accepted");

    assert!(matches!(first, PaymentEventOutcome::PurchaseCreated(_)));
    assert_eq!(second, PaymentEventOutcome::AlreadyProcessed);
    let all = harness.purchases.all();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].purchase_type, PurchaseType::CarouselHighlight);
    assert_eq!(all[0].submission_status, SubmissionStatus::Available);
}

#[rstest]
#[tokio::test]
async fn submission_requires_an_available_purchase(harness: Harness) {
    let service = harness.purchase_service();
    let purchase = seed(&harness, SubmissionStatus::Available);

    let submitted = service
        .submit_for_approval(&user_id(), purchase.id)
        .await
        .expect("available purchase can be submitted");
    assert_eq!(submitted.submission_status, SubmissionStatus::PendingApproval);

    let again = service
        .submit_for_approval(&user_id(), purchase.id)
        .await
        .expect_err("pending purchase cannot be submitted twice");
    assert_eq!(again.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_consumption_succeeds_exactly_once(harness: Harness) {
    let service = Arc::new(harness.purchase_service());
    let purchase = seed(&harness, SubmissionStatus::PendingApproval);

    let attempts = (0..8).map(|_| {
        let service = service.clone();
        let id = purchase.id;
        tokio::spawn(async move { service.consume(id, None).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task completes"))
        .collect();

    let successes = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(
        results
            .iter()
            .filter_map(|result| result.as_ref().err())
            .all(|err| err.code() == ErrorCode::Conflict)
    );
    let stored = harness.purchases.get(purchase.id).expect("purchase kept");
    assert_eq!(stored.submission_status, SubmissionStatus::Used);
}

#[rstest]
#[tokio::test]
async fn consumption_marks_the_notification_read(harness: Harness) {
    let service = harness.purchase_service();
    let purchase = seed(&harness, SubmissionStatus::PendingApproval);
    let notification = harness.purchases.add_notification();

    service
        .consume(purchase.id, Some(notification))
        .await
        .expect("pending purchase is consumed");

    assert_eq!(
        harness.purchases.notification_read_at(notification),
        Some(start_time())
    );
}

#[rstest]
#[tokio::test]
async fn rejection_returns_the_purchase_to_available(harness: Harness) {
    let service = harness.purchase_service();
    let purchase = seed(&harness, SubmissionStatus::PendingApproval);

    let rejected = service.reject(purchase.id).await.expect("pending purchase rejected");
    assert_eq!(rejected.submission_status, SubmissionStatus::Available);

    let resubmitted = service
        .submit_for_approval(&user_id(), purchase.id)
        .await
        .expect("rejected purchase can be resubmitted");
    assert_eq!(
        resubmitted.submission_status,
        SubmissionStatus::PendingApproval
    );
}

#[actix_web::test]
async fn signed_in_owner_walks_the_lifecycle_over_http() {
    let harness = Harness::new();
    let app = test::init_service(
        App::new()
            .app_data(harness.http_state())
            .service(
                web::scope("/api/v1")
                    .wrap(session_middleware())
                    .route("/test/sign-in", web::get().to(sign_in))
                    .configure(configure_api),
            )
            .configure(configure_webhooks),
    )
    .await;

    let payload = completed_checkout("cs_http_1");
    let webhook = test::TestRequest::post()
        .uri("/webhooks/stripe")
        .insert_header(("Stripe-Signature", stripe_signature(start_time().timestamp(), &payload)))
        .set_payload(payload)
        .to_request();
    let response = test::call_service(&app, webhook).await;
    assert_eq!(response.status(), StatusCode::OK);

    let login = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/test/sign-in").to_request(),
    )
    .await;
    let cookie = login
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie issued")
        .into_owned();

    let listed: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/purchases")
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    let purchases = listed.as_array().expect("purchase list");
    assert_eq!(purchases.len(), 1);
    let id = purchases[0]["id"].as_str().expect("purchase id").to_owned();

    let submit = test::TestRequest::post()
        .uri(&format!("/api/v1/purchases/{id}/submission"))
        .cookie(cookie.clone())
        .to_request();
    let submitted: Value = test::call_and_read_body_json(&app, submit).await;
    assert_eq!(submitted["submissionStatus"], "PENDING_APPROVAL");

    let consume = test::TestRequest::post()
        .uri(&format!("/api/v1/purchases/{id}/consumption"))
        .cookie(cookie.clone())
        .to_request();
    let consumed: Value = test::call_and_read_body_json(&app, consume).await;
    assert_eq!(consumed["submissionStatus"], "USED");

    let replay = test::TestRequest::post()
        .uri(&format!("/api/v1/purchases/{id}/consumption"))
        .cookie(cookie)
        .to_request();
    let response = test::call_service(&app, replay).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
