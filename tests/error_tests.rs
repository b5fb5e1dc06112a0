// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::response::IntoResponse;
use reflect_ai::error::{AppError, CreditKind};

async fn body_of(err: AppError) -> serde_json::Value {
    let bytes = axum::body::to_bytes(err.into_response().into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_database_details_are_hidden() {
    let body = body_of(AppError::Database("connection to 10.0.0.7 refused".into())).await;
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_model_details_are_hidden() {
    let body = body_of(AppError::AiModel("HTTP 500: upstream trace".into())).await;
    assert_eq!(body["error"], "model_error");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_no_credits_body_is_user_facing() {
    let body = body_of(AppError::NoCredits(CreditKind::AdviceChat)).await;
    assert_eq!(body["error"], "no_credits");
    assert_eq!(body["details"], "You have no advice chat credits remaining.");
}

#[tokio::test]
async fn test_permission_denied_reports_path() {
    let body = body_of(AppError::permission_denied("users/abc/analysisResults", "delete")).await;
    assert_eq!(body["error"], "permission_denied");
    assert_eq!(body["details"], "users/abc/analysisResults");
}

#[test]
fn test_validation_errors_become_bad_request() {
    use validator::Validate;

    let update = reflect_ai::models::ProfileUpdate {
        display_name: Some(String::new()),
        photo_url: None,
    };
    let err: AppError = update.validate().unwrap_err().into();
    assert!(matches!(err, AppError::BadRequest(_)));
}
