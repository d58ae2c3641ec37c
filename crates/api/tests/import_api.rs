//! CSV bulk import of savings accounts.

mod common;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use common::{body_json, get, login_as, post_json};
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;

const BOUNDARY: &str = "savings-import-boundary";

async fn upload(app: &Router, uri: &str, token: &str, csv: &str) -> Response {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"accounts.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {csv}\r\n\
         --{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn create_product(app: &Router, token: &str) -> i64 {
    let response = post_json(
        app,
        "/api/v1/savingsproducts",
        token,
        json!({
            "name": "Passbook Savings",
            "shortName": "PB01",
            "currencyCode": "USD",
            "digitsAfterDecimal": 2,
            "nominalAnnualInterestRate": 0,
            "interestCompoundingPeriodType": 1,
            "interestPostingPeriodType": 4,
            "interestCalculationType": 1,
            "interestCalculationDaysInYearType": 365
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["resourceId"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_activation_leaves_no_partial_account(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = login_as(&app, &pool, "admin1", "admin").await;
    let product_id = create_product(&app, &token).await;

    let csv = format!(
        "clientId,productId,submittedOnDate,approvedOnDate,activatedOnDate\n\
         7,{product_id},2024-01-01,2024-01-02,2024-01-03\n\
         8,{product_id},2024-01-01,2024-01-05,2024-01-03"
    );
    let response = upload(&app, "/api/v1/savingsaccounts/uploadtemplate", &token, &csv).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let document = body_json(response).await;
    assert_eq!(document["entityType"], "savingsaccounts");
    assert_eq!(document["fileName"], "accounts.csv");
    assert_eq!(document["totalRecords"], 2);
    assert_eq!(document["successCount"], 1);
    assert_eq!(document["failureCount"], 1);
    assert_eq!(document["completed"], true);
    assert_eq!(document["errors"][0]["row"], 3);

    let response = get(&app, "/api/v1/savingsaccounts", Some(&token)).await;
    let page = body_json(response).await;
    assert_eq!(page["totalFilteredRecords"], 1);
    assert_eq!(page["pageItems"][0]["clientId"], 7);
    assert_eq!(page["pageItems"][0]["status"]["id"], 300);

    let response = get(&app, "/api/v1/audits?actionName=CREATE", Some(&token)).await;
    let audits = body_json(response).await;
    let account_creates = audits["pageItems"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|a| a["entityName"] == "SAVINGSACCOUNT")
        .count();
    assert_eq!(account_creates, 1);

    let document_id = document["id"].as_i64().unwrap();
    let response = get(&app, &format!("/api/v1/imports/{document_id}"), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["failureCount"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_without_a_file_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = login_as(&app, &pool, "admin1", "admin").await;

    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"note\"\r\n\r\n\
         no file here\r\n\
         --{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/savingsaccounts/uploadtemplate")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
