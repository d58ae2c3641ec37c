//! Tests for `AppError` → HTTP response mapping.
//!
//! No server or database is needed: each test calls `IntoResponse` on an
//! `AppError` value directly.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use savings_api::error::{AppError, CONCURRENT_MODIFICATION};
use savings_core::error::CoreError;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "SavingsAccount",
        id: 42,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "SavingsAccount with id 42 not found");
}

#[tokio::test]
async fn domain_rule_carries_error_code() {
    let err = AppError::Core(CoreError::rule(
        "savingsaccount.transaction.insufficient.account.balance",
        "Insufficient account balance",
    ));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "DOMAIN_RULE_VIOLATION");
    assert_eq!(
        json["errorCode"],
        "error.msg.savingsaccount.transaction.insufficient.account.balance"
    );
    assert_eq!(json["error"], "Insufficient account balance");
}

#[tokio::test]
async fn unrecognized_query_param_lists_allowed_values() {
    let err = AppError::Core(CoreError::UnrecognizedQueryParam {
        param: "command".into(),
        value: "bogus".into(),
        allowed: vec!["approve".into(), "reject".into()],
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "UNRECOGNIZED_QUERY_PARAM");
    assert_eq!(json["parameter"], "command");
    assert_eq!(json["allowedValues"], serde_json::json!(["approve", "reject"]));
}

#[tokio::test]
async fn data_integrity_returns_409() {
    let err = AppError::Core(CoreError::DataIntegrity(CONCURRENT_MODIFICATION.into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "DATA_INTEGRITY");
}

#[tokio::test]
async fn bad_request_error_returns_400() {
    let (status, json) = error_to_response(AppError::BadRequest("invalid field value".into())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "invalid field value");
}

#[tokio::test]
async fn forbidden_returns_403() {
    let err = AppError::Core(CoreError::Forbidden("no authority".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "FORBIDDEN");
}

#[tokio::test]
async fn row_not_found_maps_to_404() {
    let (status, json) = error_to_response(AppError::Database(sqlx::Error::RowNotFound)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn internal_errors_are_sanitized() {
    let err = AppError::InternalError("connection string leaked: postgres://secret".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}
