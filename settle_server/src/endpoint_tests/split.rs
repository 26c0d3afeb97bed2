use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::helpers::{json, test_app};

#[actix_web::test]
async fn health() {
    let app = test_app();
    let (status, body) = app.call(TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn equal_split() {
    let app = test_app();
    let (status, body) = app.post_json("/api/bills/7/split", &json!({ "method": "equal", "num_people": 3 })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result = json(&body);
    assert_eq!(result["method"], "equal");
    assert_eq!(result["bill_id"], 7);
    assert_eq!(result["total_amount"], "100.00");
    let amounts = result["splits"].as_array().unwrap().iter().map(|s| s["amount"].clone()).collect::<Vec<_>>();
    assert_eq!(amounts, vec![json!("33.33"), json!("33.33"), json!("33.34")]);
}

#[actix_web::test]
async fn item_split() {
    let app = test_app();
    let request = json!({
        "method": "items",
        "assignments": { "alice": [1], "bob": [2, 3] },
        "labels": { "alice": "Alice" }
    });
    let (status, body) = app.post_json("/api/bills/7/split", &request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result = json(&body);
    let splits = result["splits"].as_array().unwrap();
    assert_eq!(splits.len(), 2);
    assert_eq!(splits[0]["person_id"], "alice");
    assert_eq!(splits[0]["name"], "Alice");
    assert_eq!(splits[0]["amount"], "50.00");
    assert_eq!(splits[1]["person_id"], "bob");
    assert_eq!(splits[1]["amount"], "50.00");
    assert_eq!(splits[1]["items"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn custom_split() {
    let app = test_app();
    let request = json!({ "method": "custom", "amounts": { "alice": "60.00", "bob": "40.00" } });
    let (status, body) = app.post_json("/api/bills/7/split", &request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result = json(&body);
    assert_eq!(result["splits"][0]["subtotal_share"], "60.00");
    assert_eq!(result["splits"][1]["amount"], "40.00");
}

#[actix_web::test]
async fn split_errors_have_distinct_statuses() {
    let app = test_app();
    let cases = [
        (json!({ "method": "equal", "num_people": 0 }), StatusCode::BAD_REQUEST),
        (json!({ "method": "items", "assignments": { "alice": [1, 2, 3, 99] } }), StatusCode::NOT_FOUND),
        (json!({ "method": "custom", "amounts": { "alice": "30.00", "bob": "20.00" } }), StatusCode::CONFLICT),
        (json!({ "method": "items", "assignments": { "alice": [1] } }), StatusCode::UNPROCESSABLE_ENTITY),
        (json!({ "method": "equal", "num_people": 4_000_000_000u32 }), StatusCode::BAD_REQUEST),
        (
            json!({ "method": "custom", "amounts": {
                "a": "92233720368547758.07", "b": "92233720368547758.07", "c": "100.02"
            } }),
            StatusCode::BAD_REQUEST,
        ),
    ];
    for (request, expected) in cases {
        let (status, body) = app.post_json("/api/bills/7/split", &request).await;
        assert_eq!(status, expected, "{request} gave {body}");
        assert!(json(&body)["error"].is_string());
    }
}

#[actix_web::test]
async fn split_of_unknown_bill() {
    let app = test_app();
    let (status, body) = app.post_json("/api/bills/42/split", &json!({ "method": "equal", "num_people": 2 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "The data was not found. Bill #42 does not exist");
}

#[actix_web::test]
async fn unknown_split_method() {
    let app = test_app();
    let (status, _) = app.post_json("/api/bills/7/split", &json!({ "method": "dice", "num_people": 2 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
