use axum::http::StatusCode;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AuthError;
use crate::models::account::{Account, AccountResponse};
use crate::services::UPSTREAM_FAILURE;

/// Outcome label carried by every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Fail,
}

/// Uniform result of every service operation.
///
/// The transport projects `status`, `status_code` and `message` onto the wire
/// verbatim; `error` is kept for logging only and is never serialized.
#[derive(Debug)]
pub struct ServiceResponse {
    pub status: Status,
    pub status_code: StatusCode,
    pub message: String,
    pub error: Option<AuthError>,
    pub user: Option<Account>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl ServiceResponse {
    /// A 200 envelope with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        ServiceResponse {
            status: Status::Success,
            status_code: StatusCode::OK,
            message: message.into(),
            error: None,
            user: None,
            access_token: None,
            refresh_token: None,
        }
    }

    /// A failed envelope with an explicit status code and user-visible message.
    pub fn fail(status_code: StatusCode, message: impl Into<String>) -> Self {
        ServiceResponse {
            status: Status::Fail,
            status_code,
            message: message.into(),
            error: None,
            user: None,
            access_token: None,
            refresh_token: None,
        }
    }

    /// A failed envelope whose status code comes from the error itself.
    ///
    /// Client errors show the error text. Server-side failures (store, mail,
    /// signing) show the generic upstream message and keep the cause for logs.
    pub fn from_error(error: AuthError) -> Self {
        let status_code = error.status_code();
        let message = if status_code.is_server_error() {
            UPSTREAM_FAILURE.to_string()
        } else {
            error.to_string()
        };
        let mut response = ServiceResponse::fail(status_code, message);
        response.error = Some(error);
        response
    }

    pub fn with_error(mut self, error: impl Into<AuthError>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_user(mut self, user: Account) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_access_token(mut self, token: String) -> Self {
        self.access_token = Some(token);
        self
    }

    pub fn with_refresh_token(mut self, token: String) -> Self {
        self.refresh_token = Some(token);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// The JSON body sent to the client.
    pub fn body(&self) -> EnvelopeBody {
        EnvelopeBody {
            status: self.status,
            message: (!self.message.is_empty()).then(|| self.message.clone()),
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            data: self.user.clone().map(|user| UserData {
                user: AccountResponse::from(user),
            }),
        }
    }
}

/// Wire format of an envelope.
///
/// ```json
/// {
///   "status": "success",
///   "message": "...",
///   "access_token": "...",
///   "data": { "user": { ... } }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct EnvelopeBody {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<UserData>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserData {
    pub user: AccountResponse,
}

impl axum::response::IntoResponse for ServiceResponse {
    fn into_response(self) -> axum::response::Response {
        if let Some(ref err) = self.error {
            if self.status_code.is_server_error() {
                tracing::warn!(
                    status = self.status_code.as_u16(),
                    code = err.error_code(),
                    error = %err,
                    "request failed"
                );
            } else {
                tracing::debug!(
                    status = self.status_code.as_u16(),
                    code = err.error_code(),
                    error = %err,
                    "request rejected"
                );
            }
        }
        (self.status_code, axum::Json(self.body())).into_response()
    }
}
