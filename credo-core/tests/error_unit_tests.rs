use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use credo_core::error::AuthError;
use credo_core::mail::MailError;
use credo_core::models::{Account, Role, SignUpInput};
use credo_core::response::{ServiceResponse, Status};
use credo_core::services::UPSTREAM_FAILURE;
use credo_core::store::StoreError;
use validator::Validate;

fn account() -> Account {
    Account {
        id: "acc-1".to_string(),
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        password_digest: "$argon2id$secret".to_string(),
        role: Role::User,
        verified: true,
        verification_code: Some("c2VjcmV0".to_string()),
        password_reset_token: None,
        password_reset_expires_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn status_codes_follow_the_taxonomy() {
    assert_eq!(AuthError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(AuthError::InvalidCredentials.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(AuthError::Unverified.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(AuthError::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(AuthError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
    assert_eq!(AuthError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
    assert_eq!(AuthError::Signing("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        AuthError::from(StoreError::DuplicateEmail).status_code(),
        StatusCode::CONFLICT
    );
    assert_eq!(AuthError::from(StoreError::NotFound).status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
        AuthError::from(StoreError::Unavailable("down".into())).status_code(),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        AuthError::from(MailError::Unavailable("down".into())).status_code(),
        StatusCode::BAD_GATEWAY
    );
}

#[test]
fn duplicate_email_and_conflict_share_a_code() {
    assert_eq!(AuthError::Conflict("x".into()).error_code(), "EMAIL_TAKEN");
    assert_eq!(AuthError::from(StoreError::DuplicateEmail).error_code(), "EMAIL_TAKEN");
}

#[test]
fn upstream_failures_are_flagged() {
    assert!(AuthError::from(StoreError::Unavailable("down".into())).is_upstream());
    let rejected = MailError::Rejected {
        status: 500,
        body: String::new(),
    };
    assert!(AuthError::from(rejected).is_upstream());
    assert!(!AuthError::from(StoreError::NotFound).is_upstream());
    assert!(!AuthError::InvalidCredentials.is_upstream());
}

#[test]
fn validation_errors_name_the_fields() {
    let input = SignUpInput {
        name: String::new(),
        email: "not-an-email".to_string(),
        password: "short".to_string(),
        password_confirm: "short".to_string(),
    };
    let err: AuthError = input.validate().unwrap_err().into();
    let AuthError::Validation(message) = err else {
        panic!("expected a validation error");
    };
    assert!(message.contains("email:"));
    assert!(message.contains("name:"));
    assert!(message.contains("password:"));
}

#[test]
fn envelope_body_hides_error_and_digest() {
    let response = ServiceResponse::success("ok")
        .with_user(account())
        .with_access_token("a.b.c".to_string())
        .with_error(AuthError::Internal("driver detail".into()));

    let json = serde_json::to_value(response.body()).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "ok");
    assert_eq!(json["access_token"], "a.b.c");
    assert!(json.get("refresh_token").is_none());
    assert_eq!(json["data"]["user"]["email"], "ada@example.com");
    assert_eq!(json["data"]["user"]["role"], "user");

    let text = json.to_string();
    assert!(!text.contains("driver detail"));
    assert!(!text.contains("argon2"));
    assert!(!text.contains("c2VjcmV0"));
}

#[test]
fn empty_message_is_omitted() {
    let json = serde_json::to_value(ServiceResponse::success("").body()).unwrap();
    assert_eq!(json, serde_json::json!({ "status": "success" }));
}

#[test]
fn fail_envelope_carries_status_code() {
    let response = ServiceResponse::fail(StatusCode::FORBIDDEN, "nope");
    assert_eq!(response.status, Status::Fail);
    assert!(!response.is_success());
    assert_eq!(response.into_response().status(), StatusCode::FORBIDDEN);
}

#[test]
fn error_renders_through_the_envelope() {
    let response = AuthError::Validation("Invalid JSON".into()).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn first_name_is_the_first_word() {
    let mut account = account();
    assert_eq!(account.first_name(), "Ada");
    account.name = "Cher".to_string();
    assert_eq!(account.first_name(), "Cher");
}

#[test]
fn server_errors_render_a_generic_message() {
    let cases = [
        AuthError::from(StoreError::Unavailable("connection refused on 10.0.0.7".into())),
        AuthError::from(MailError::Unavailable("smtp relay down".into())),
        AuthError::Internal("driver detail".into()),
        AuthError::Signing("bad key".into()),
    ];
    for err in cases {
        let response = ServiceResponse::from_error(err);
        assert!(response.status_code.is_server_error());
        assert_eq!(response.message, UPSTREAM_FAILURE);
        assert!(response.error.is_some());
    }

    let response = ServiceResponse::from_error(AuthError::Validation("Invalid JSON".into()));
    assert_eq!(response.status_code, StatusCode::BAD_REQUEST);
    assert_eq!(response.message, "Validation error: Invalid JSON");
}
