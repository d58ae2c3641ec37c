//! Charge definitions applied to accounts, and product maintenance.

mod common;

use axum::http::{Method, StatusCode};
use axum::Router;
use common::{body_json, decimal, get, login_as, post_json, send};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use sqlx::PgPool;

async fn create_product(app: &Router, token: &str, path: &str, short_name: &str) -> i64 {
    let response = post_json(
        app,
        &format!("/api/v1/{path}"),
        token,
        json!({
            "name": format!("Product {short_name}"),
            "shortName": short_name,
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

async fn open_savings(app: &Router, token: &str, product_id: i64) -> i64 {
    let response = post_json(
        app,
        "/api/v1/savingsaccounts",
        token,
        json!({ "clientId": 7, "productId": product_id, "submittedOnDate": "2024-01-01" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let account_id = body_json(response).await["resourceId"].as_i64().unwrap();

    for (command, field) in [("approve", "approvedOnDate"), ("activate", "activatedOnDate")] {
        let response = post_json(
            app,
            &format!("/api/v1/savingsaccounts/{account_id}?command={command}"),
            token,
            json!({ field: "2024-01-01" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK, "{command} failed");
    }
    account_id
}

async fn define_due_date_charge(app: &Router, token: &str, name: &str, amount: i64) -> i64 {
    let response = post_json(
        app,
        "/api/v1/charges",
        token,
        json!({
            "name": name,
            "currencyCode": "USD",
            "amount": amount,
            "chargeTimeType": 2,
            "chargeCalculationType": 1
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["resourceId"].as_i64().unwrap()
}

/// Attach a charge definition to an account. Returns the account charge id.
async fn add_charge(app: &Router, token: &str, account_id: i64, charge_id: i64, due: &str) -> i64 {
    let response = post_json(
        app,
        &format!("/api/v1/savingsaccounts/{account_id}/charges"),
        token,
        json!({ "chargeId": charge_id, "dueDate": due }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["resourceId"].as_i64().unwrap()
}

async fn charge_command(
    app: &Router,
    token: &str,
    account_id: i64,
    charge_id: i64,
    command: &str,
    body: Value,
) -> (StatusCode, Value) {
    let response = post_json(
        app,
        &format!("/api/v1/savingsaccounts/{account_id}/charges/{charge_id}?command={command}"),
        token,
        body,
    )
    .await;
    let status = response.status();
    (status, body_json(response).await)
}

async fn account_charge(app: &Router, token: &str, account_id: i64, charge_id: i64) -> Value {
    let response = get(
        app,
        &format!("/api/v1/savingsaccounts/{account_id}/charges/{charge_id}"),
        Some(token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn balance(app: &Router, token: &str, account_id: i64) -> Decimal {
    let response = get(app, &format!("/api/v1/savingsaccounts/{account_id}"), Some(token)).await;
    decimal(&body_json(response).await["summary"]["accountBalance"])
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn account_charges_are_paid_waived_and_inactivated(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = login_as(&app, &pool, "admin1", "admin").await;
    let product_id = create_product(&app, &token, "savingsproducts", "SB01").await;
    let account_id = open_savings(&app, &token, product_id).await;
    let response = post_json(
        &app,
        &format!("/api/v1/savingsaccounts/{account_id}/transactions?command=deposit"),
        &token,
        json!({ "transactionDate": "2024-01-02", "transactionAmount": 100 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stamp = define_due_date_charge(&app, &token, "Stamp duty", 10).await;
    let courier = define_due_date_charge(&app, &token, "Courier", 5).await;
    let paid = add_charge(&app, &token, account_id, stamp, "2024-02-01").await;
    let waived = add_charge(&app, &token, account_id, courier, "2024-03-01").await;
    let dropped = add_charge(&app, &token, account_id, courier, "2024-04-01").await;

    let (status, result) = charge_command(
        &app,
        &token,
        account_id,
        paid,
        "paycharge",
        json!({ "transactionDate": "2024-02-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&result["changes"]["amountOutstanding"]), Decimal::ZERO);
    let charge = account_charge(&app, &token, account_id, paid).await;
    assert_eq!(charge["paid"], true);
    assert_eq!(decimal(&charge["amountPaid"]), dec!(10));
    assert_eq!(balance(&app, &token, account_id).await, dec!(90));

    let (status, _) = charge_command(&app, &token, account_id, waived, "waive", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let charge = account_charge(&app, &token, account_id, waived).await;
    assert_eq!(charge["waived"], true);
    assert_eq!(decimal(&charge["amountWaived"]), dec!(5));
    assert_eq!(decimal(&charge["amountOutstanding"]), Decimal::ZERO);
    assert_eq!(balance(&app, &token, account_id).await, dec!(90));

    let (status, result) = charge_command(
        &app,
        &token,
        account_id,
        dropped,
        "inactivate",
        json!({ "inactivationOnDate": "2024-03-15" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["changes"]["active"], false);

    let (status, error) = charge_command(
        &app,
        &token,
        account_id,
        dropped,
        "paycharge",
        json!({ "transactionDate": "2024-04-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["errorCode"].as_str().unwrap().contains("charge.is.inactive"));
    assert_eq!(balance(&app, &token, account_id).await, dec!(90));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn paying_more_than_outstanding_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = login_as(&app, &pool, "admin1", "admin").await;
    let product_id = create_product(&app, &token, "savingsproducts", "SB01").await;
    let account_id = open_savings(&app, &token, product_id).await;
    let stamp = define_due_date_charge(&app, &token, "Stamp duty", 10).await;
    let charge_id = add_charge(&app, &token, account_id, stamp, "2024-02-01").await;

    let (status, error) = charge_command(
        &app,
        &token,
        account_id,
        charge_id,
        "paycharge",
        json!({ "amount": 25, "transactionDate": "2024-02-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["errorCode"]
        .as_str()
        .unwrap()
        .contains("charge.amount.exceeds.outstanding"));

    let charge = account_charge(&app, &token, account_id, charge_id).await;
    assert_eq!(decimal(&charge["amountOutstanding"]), dec!(10));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn products_are_created_updated_and_deleted(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = login_as(&app, &pool, "admin1", "admin").await;
    let product_id = create_product(&app, &token, "fixeddepositproducts", "FD01").await;

    let response = get(&app, &format!("/api/v1/fixeddepositproducts/{product_id}"), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let product = body_json(response).await;
    assert_eq!(product["name"], "Product FD01");
    assert_eq!(product["shortName"], "FD01");

    let response = send(
        &app,
        Method::PUT,
        &format!("/api/v1/fixeddepositproducts/{product_id}"),
        Some(&token),
        Some(json!({ "name": "Term Deposit", "nominalAnnualInterestRate": 7 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, &format!("/api/v1/fixeddepositproducts/{product_id}"), Some(&token)).await;
    let product = body_json(response).await;
    assert_eq!(product["name"], "Term Deposit");
    assert_eq!(decimal(&product["nominalAnnualInterestRate"]), dec!(7));

    let response = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/fixeddepositproducts/{product_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, &format!("/api/v1/fixeddepositproducts/{product_id}"), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_a_product_in_use_conflicts(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = login_as(&app, &pool, "admin1", "admin").await;
    let product_id = create_product(&app, &token, "savingsproducts", "SB01").await;
    open_savings(&app, &token, product_id).await;

    let response = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/savingsproducts/{product_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");

    let response = get(&app, &format!("/api/v1/savingsproducts/{product_id}"), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
