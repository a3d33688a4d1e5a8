use axum::http::StatusCode;
use thiserror::Error;

use crate::mail::MailError;
use crate::response::ServiceResponse;
use crate::store::StoreError;

/// Error taxonomy shared by every service operation.
///
/// Services never hand an `AuthError` straight to a client: they pick a
/// pre-composed message for the envelope and keep the error as the
/// envelope's cause, so driver or transport detail only reaches the logs.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account has not been verified")]
    Unverified,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Failed to hash password: {0}")]
    Hashing(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Failed to decode opaque value: {0}")]
    Decode(String),

    #[error("Invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AuthError::Unverified => StatusCode::UNAUTHORIZED,
            AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Decode(_) => StatusCode::BAD_REQUEST,
            AuthError::Token(_) => StatusCode::FORBIDDEN,
            AuthError::Store(StoreError::DuplicateEmail) => StatusCode::CONFLICT,
            AuthError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            AuthError::Store(_) => StatusCode::BAD_GATEWAY,
            AuthError::Mail(_) => StatusCode::BAD_GATEWAY,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::Unverified => "UNVERIFIED",
            AuthError::Unauthorized(_) => "UNAUTHORIZED",
            AuthError::Forbidden(_) => "FORBIDDEN",
            AuthError::Conflict(_) => "EMAIL_TAKEN",
            AuthError::Hashing(_) => "HASHING_ERROR",
            AuthError::Signing(_) => "SIGNING_ERROR",
            AuthError::Decode(_) => "DECODE_ERROR",
            AuthError::Token(_) => "INVALID_TOKEN",
            AuthError::Store(StoreError::DuplicateEmail) => "EMAIL_TAKEN",
            AuthError::Store(StoreError::NotFound) => "NOT_FOUND",
            AuthError::Store(_) => "UPSTREAM_ERROR",
            AuthError::Mail(_) => "UPSTREAM_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True when the failure is attributable to a collaborator rather than the caller.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AuthError::Store(
                StoreError::Unavailable(_) | StoreError::Timeout(_) | StoreError::Database(_)
            ) | AuthError::Mail(_)
        )
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reason = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{}: {}", field, reason)
            })
            .collect();
        fields.sort();
        AuthError::Validation(fields.join("; "))
    }
}

impl axum::response::IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        ServiceResponse::from_error(self).into_response()
    }
}
