//! Interest posting and maturity passes run against a real database.

mod common;

use axum::http::StatusCode;
use common::{body_json, decimal, get, login_as, post_json};
use rust_decimal::Decimal;
use savings_api::background::{deposit_maturity, interest_posting};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn passes_over_an_empty_book_do_nothing(pool: PgPool) {
    let state = common::test_state(pool);

    assert_eq!(interest_posting::run_once(&state).await, 0);
    assert_eq!(deposit_maturity::run_once(&state).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn interest_posting_is_idempotent(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = login_as(&app, &pool, "admin1", "admin").await;

    let response = post_json(
        &app,
        "/api/v1/savingsproducts",
        &token,
        json!({
            "name": "Interest Savings",
            "shortName": "IS01",
            "currencyCode": "USD",
            "nominalAnnualInterestRate": 5,
            "interestCompoundingPeriodType": 1,
            "interestPostingPeriodType": 4,
            "interestCalculationType": 1,
            "interestCalculationDaysInYearType": 365
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let product_id = body_json(response).await["resourceId"].as_i64().unwrap();

    let response = post_json(
        &app,
        "/api/v1/savingsaccounts",
        &token,
        json!({ "groupId": 3, "productId": product_id, "submittedOnDate": "2024-01-01" }),
    )
    .await;
    let account_id = body_json(response).await["resourceId"].as_i64().unwrap();
    for (command, field) in [("approve", "approvedOnDate"), ("activate", "activatedOnDate")] {
        let response = post_json(
            &app,
            &format!("/api/v1/savingsaccounts/{account_id}?command={command}"),
            &token,
            json!({ field: "2024-01-01" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = post_json(
        &app,
        &format!("/api/v1/savingsaccounts/{account_id}/transactions?command=deposit"),
        &token,
        json!({ "transactionDate": "2024-01-02", "transactionAmount": 1000 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let state = common::test_state(pool);
    assert_eq!(interest_posting::run_once(&state).await, 1);
    assert_eq!(interest_posting::run_once(&state).await, 0);

    let response = get(&app, &format!("/api/v1/savingsaccounts/{account_id}"), Some(&token)).await;
    let account = body_json(response).await;
    let posted = decimal(&account["summary"]["totalInterestPosted"]);
    assert!(posted > Decimal::ZERO);
    assert_eq!(
        decimal(&account["summary"]["accountBalance"]),
        Decimal::from(1000) + posted
    );
}
