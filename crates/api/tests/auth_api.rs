//! HTTP-level tests for login and permission enforcement.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, create_user, get, login_as, post_json, send, TEST_PASSWORD};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_success_returns_token_and_permissions(pool: PgPool) {
    let user_id = create_user(&pool, "loginuser", "admin").await;
    let app = common::build_test_app(pool);

    let response = send(
        &app,
        Method::POST,
        "/api/v1/authentication",
        None,
        Some(json!({ "username": "loginuser", "password": TEST_PASSWORD })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["accessToken"].is_string());
    assert_eq!(json["authenticated"], true);
    assert_eq!(json["userId"], user_id);
    assert_eq!(json["role"], "admin");
    assert_eq!(json["expiresIn"], 3600);
    assert_eq!(json["permissions"], json!(["ALL_FUNCTIONS"]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_wrong_password_returns_401(pool: PgPool) {
    create_user(&pool, "wrongpw", "teller").await;
    let app = common::build_test_app(pool);

    let response = send(
        &app,
        Method::POST,
        "/api/v1/authentication",
        None,
        Some(json!({ "username": "wrongpw", "password": "incorrect" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_unknown_user_returns_401(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = send(
        &app,
        Method::POST,
        "/api/v1/authentication",
        None,
        Some(json!({ "username": "ghost", "password": "whatever" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_token_returns_401() {
    let app = common::build_lazy_app();

    let response = get(&app, "/api/v1/savingsaccounts", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn garbage_token_returns_401() {
    let app = common::build_lazy_app();

    let response = get(&app, "/api/v1/savingsaccounts", Some("not-a-jwt")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn auditor_can_read_but_not_approve(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = login_as(&app, &pool, "auditor1", "auditor").await;

    let list = get(&app, "/api/v1/savingsaccounts", Some(&token)).await;
    assert_eq!(list.status(), StatusCode::OK);
    let page = body_json(list).await;
    assert_eq!(page["totalFilteredRecords"], 0);

    let response = post_json(
        &app,
        "/api/v1/savingsaccounts/1?command=approve",
        &token,
        json!({ "approvedOnDate": "2024-01-01" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["code"], "FORBIDDEN");
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("APPROVE_SAVINGSACCOUNT"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn teller_cannot_create_products(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = login_as(&app, &pool, "teller1", "teller").await;

    let response = post_json(
        &app,
        "/api/v1/savingsproducts",
        &token,
        json!({
            "name": "Passbook",
            "shortName": "PB01",
            "currencyCode": "USD",
            "interestCompoundingPeriodType": 1,
            "interestPostingPeriodType": 4,
            "interestCalculationType": 1,
            "interestCalculationDaysInYearType": 365
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_command_lists_allowed_values() {
    let app = common::build_lazy_app();
    let token = common::token_for(1, "admin");

    let response = post_json(
        &app,
        "/api/v1/savingsaccounts/1?command=bogus",
        &token,
        json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNRECOGNIZED_QUERY_PARAM");
    assert_eq!(json["parameter"], "command");
    let allowed = json["allowedValues"].as_array().unwrap();
    assert!(allowed.iter().any(|v| v == "approve"));
}

#[tokio::test]
async fn teller_cannot_approve_before_any_lookup() {
    let app = common::build_lazy_app();
    let token = common::token_for(5, "teller");

    let response = post_json(
        &app,
        "/api/v1/fixeddepositaccounts/1?command=approve",
        &token,
        json!({ "approvedOnDate": "2024-01-01" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let app = common::build_lazy_app();
    let mut config = common::test_config().jwt;
    config.secret = "some-other-secret".into();
    let token = savings_api::auth::jwt::generate_access_token(1, "admin", &config).unwrap();

    let response = get(&app, "/api/v1/charges", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_charge_status_is_rejected() {
    let app = common::build_lazy_app();
    let token = common::token_for(1, "auditor");

    let response = get(&app, "/api/v1/savingsaccounts/1/charges?chargeStatus=paid", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "UNRECOGNIZED_QUERY_PARAM");
}
