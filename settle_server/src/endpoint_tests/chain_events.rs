use std::time::Duration;

use actix_web::http::StatusCode;
use serde_json::json;
use settle_common::Money;
use settle_engine::{db_types::BillStatus, test_utils::payment_log, Room};

use super::helpers::{json, test_app, TestApp, BILL_ID, RELAY_SECRET};

async fn start_monitor(app: &TestApp) {
    app.monitor.start().await.unwrap();
    // let the start-up sweep go past bill #7 before any payment lands
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while app.chain.query_count() == 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[actix_web::test]
async fn unsigned_relay_calls_are_refused() {
    let app = test_app();
    let log = payment_log(BILL_ID, Money::from_units(55), Money::ZERO, 1);
    let (status, _) = app.post_json("/chain/events", &log).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.post_signed("/chain/events", &log, "not-the-secret").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.post_signed("/api/bills/7/confirmation", &json!({ "tx_hash": log.tx_hash }), "nope").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn relayed_payment_reaches_the_bill() {
    let app = test_app();
    start_monitor(&app).await;
    let log = payment_log(BILL_ID, Money::from_units(55), Money::from_units(5), 1);
    let (status, body) = app.post_signed("/chain/events", &log, RELAY_SECRET).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body), json!({ "accepted": 1, "rejected": 0 }));

    let bill = app.wait_for_paid(Money::from_units(60)).await;
    assert_eq!(bill.paid_amount, Money::from_units(60));
    assert_eq!(bill.tip_amount, Money::from_units(5));
    assert_eq!(bill.status, BillStatus::Partial);

    // the relay retries the whole batch, plus the final payment
    let batch = vec![log, payment_log(BILL_ID, Money::from_units(40), Money::ZERO, 2)];
    let (status, body) = app.post_signed("/chain/events", &batch, RELAY_SECRET).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let bill = app.wait_for_paid(Money::from_units(100)).await;
    assert_eq!(bill.paid_amount, Money::from_units(100));
    assert_eq!(bill.tip_amount, Money::from_units(5));
    assert_eq!(bill.status, BillStatus::Paid);
    app.monitor.stop().await;
}

#[actix_web::test]
async fn malformed_logs_are_rejected() {
    let app = test_app();
    let mut bad = payment_log(BILL_ID, Money::from_units(10), Money::ZERO, 3);
    bad.tx_hash = "0x1234".into();
    let good = payment_log(BILL_ID, Money::from_units(10), Money::ZERO, 4);
    let (status, body) = app.post_signed("/chain/events", &vec![bad, good], RELAY_SECRET).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body), json!({ "accepted": 1, "rejected": 1 }));
}

#[actix_web::test]
async fn hmac_checks_can_be_disabled() {
    let app = test_app().without_hmac_checks();
    let log = payment_log(BILL_ID, Money::from_units(10), Money::ZERO, 5);
    let (status, body) = app.post_json("/chain/events", &log).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[actix_web::test]
async fn confirmations_are_broadcast() {
    let app = test_app();
    let mut watcher = app.hub.register([Room::bill(BILL_ID)]).await.unwrap();
    let mut bystander = app.hub.register([Room::bill(8)]).await.unwrap();
    let tx_hash = format!("0x{:064x}", 9);
    let request = json!({ "tx_hash": tx_hash });
    let (status, body) = app.post_signed("/api/bills/7/confirmation", &request, RELAY_SECRET).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body), json!({ "bill_id": 7, "tx_hash": tx_hash, "status": "open" }));

    app.hub.connection_count().await.unwrap();
    let msg = watcher.receiver.try_recv().expect("no confirmation was broadcast");
    let msg = json(&msg);
    assert_eq!(msg["type"], "payment_confirmed");
    assert_eq!(msg["bill_id"], 7);
    assert_eq!(msg["tx_hash"], tx_hash.as_str());
    assert!(bystander.receiver.try_recv().is_err());
}

#[actix_web::test]
async fn confirmation_for_unknown_bill() {
    let app = test_app();
    let body = json!({ "tx_hash": format!("0x{:064x}", 9) });
    let (status, _) = app.post_signed("/api/bills/42/confirmation", &body, RELAY_SECRET).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn full_feed_asks_the_relay_to_retry() {
    let app = test_app();
    // nothing is draining the feed, so it fills up
    let logs = (0..300).map(|n| payment_log(BILL_ID, Money::from_cents(1), Money::ZERO, 100 + n)).collect::<Vec<_>>();
    let (status, body) = app.post_signed("/chain/events", &logs, RELAY_SECRET).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{body}");
    assert_eq!(app.bill().paid_amount, Money::ZERO);
}
