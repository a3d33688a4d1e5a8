use std::sync::Arc;

use axum::http::StatusCode;
use validator::Validate;

use super::{
    ACCOUNT_NOT_VERIFIED, EMAIL_TAKEN, INVALID_CODE, INVALID_OR_EXPIRED, PASSWORD_MISMATCH,
    PASSWORD_UPDATED, RESET_EMAIL_FAILED, RESET_EMAIL_SENT, UPSTREAM_FAILURE, VERIFIED, bounded,
    normalize_email, verification_sent,
};
use crate::auth::{encode_opaque, generate_code, hash_password};
use crate::config::Config;
use crate::error::AuthError;
use crate::mail::{self, Mailer};
use crate::models::{ForgotPasswordInput, NewAccount, ResetPasswordInput, Role, SignUpInput};
use crate::response::ServiceResponse;
use crate::store::{AccountStore, StoreError, expiry_after, store_now};

/// Registration, email verification and password reset.
///
/// One-time codes are emailed raw and stored encoded; an incoming code is
/// encoded again before it is matched.
pub struct LifecycleService {
    store: Arc<dyn AccountStore>,
    mailer: Arc<dyn Mailer>,
    config: Arc<Config>,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn AccountStore>, mailer: Arc<dyn Mailer>, config: Arc<Config>) -> Self {
        Self {
            store,
            mailer,
            config,
        }
    }

    /// Create an unverified account and email its verification link.
    ///
    /// Succeeds only once the email has been dispatched. A failure after the
    /// insert leaves the account in place and still reports the call as failed.
    pub async fn sign_up(&self, mut input: SignUpInput) -> ServiceResponse {
        if input.password != input.password_confirm {
            return ServiceResponse::fail(StatusCode::BAD_REQUEST, PASSWORD_MISMATCH)
                .with_error(AuthError::Validation("password mismatch".to_string()));
        }
        input.email = normalize_email(&input.email);
        if let Err(errors) = input.validate() {
            return ServiceResponse::from_error(errors.into());
        }

        let digest = match hash_password(&input.password) {
            Ok(digest) => digest,
            Err(err) => {
                return ServiceResponse::fail(StatusCode::INTERNAL_SERVER_ERROR, UPSTREAM_FAILURE)
                    .with_error(err);
            }
        };

        let now = store_now();
        let draft = NewAccount {
            name: input.name.trim().to_string(),
            email: input.email,
            password_digest: digest,
            role: Role::User,
            verified: false,
            created_at: now,
            updated_at: now,
        };

        let limit = self.config.upstream_timeout;
        let account = match bounded(limit, self.store.insert(draft)).await {
            Ok(account) => account,
            Err(StoreError::DuplicateEmail) => {
                return ServiceResponse::fail(StatusCode::CONFLICT, EMAIL_TAKEN)
                    .with_error(AuthError::Conflict(EMAIL_TAKEN.to_string()));
            }
            Err(err) => {
                return ServiceResponse::fail(StatusCode::BAD_GATEWAY, UPSTREAM_FAILURE)
                    .with_error(err);
            }
        };

        let code = generate_code();
        if let Err(err) = bounded(
            limit,
            self.store
                .set_verification_code(&account.id, &encode_opaque(&code)),
        )
        .await
        {
            return ServiceResponse::fail(StatusCode::BAD_GATEWAY, UPSTREAM_FAILURE)
                .with_error(err);
        }

        let url = self.config.verification_url(&code);
        let sent = match mail::verification_email(&account, &url) {
            Ok(message) => bounded(limit, self.mailer.send(message)).await,
            Err(err) => Err(err),
        };
        if let Err(err) = sent {
            return ServiceResponse::fail(
                StatusCode::BAD_GATEWAY,
                "There was an error sending the verification email",
            )
            .with_error(err);
        }

        tracing::info!(account_id = %account.id, "account registered, verification pending");
        ServiceResponse::success(verification_sent(&account.email))
    }

    /// Consume a raw verification code taken from the emailed link.
    pub async fn verify_email(&self, raw_code: &str) -> ServiceResponse {
        let code = encode_opaque(raw_code);
        match bounded(
            self.config.upstream_timeout,
            self.store.consume_verification_code(&code),
        )
        .await
        {
            Ok(0) => ServiceResponse::fail(StatusCode::FORBIDDEN, INVALID_CODE)
                .with_error(AuthError::Forbidden("unknown verification code".to_string())),
            Ok(_) => ServiceResponse::success(VERIFIED),
            Err(err) => ServiceResponse::fail(StatusCode::BAD_GATEWAY, UPSTREAM_FAILURE)
                .with_error(err),
        }
    }

    /// Start a password reset.
    ///
    /// An unregistered email gets the same response as a registered one and
    /// no email is sent.
    pub async fn forgot_password(&self, mut input: ForgotPasswordInput) -> ServiceResponse {
        input.email = normalize_email(&input.email);
        if let Err(errors) = input.validate() {
            return ServiceResponse::from_error(errors.into());
        }

        let limit = self.config.upstream_timeout;
        let email = input.email;

        let account = match bounded(limit, self.store.find_by_email(&email)).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => {
                tracing::debug!("password reset requested for unknown email");
                return ServiceResponse::success(RESET_EMAIL_SENT);
            }
            Err(err) => {
                return ServiceResponse::fail(StatusCode::BAD_GATEWAY, UPSTREAM_FAILURE)
                    .with_error(err);
            }
        };

        if !account.verified {
            return ServiceResponse::fail(StatusCode::UNAUTHORIZED, ACCOUNT_NOT_VERIFIED)
                .with_error(AuthError::Unverified);
        }

        let token = generate_code();
        let expires_at = expiry_after(self.config.password_reset_expires_in);
        let stored = bounded(
            limit,
            self.store
                .set_reset_token(&account.email, &encode_opaque(&token), expires_at),
        )
        .await;

        match stored {
            Ok(0) => return ServiceResponse::success(RESET_EMAIL_SENT),
            Ok(_) => {}
            Err(err) => {
                return ServiceResponse::fail(StatusCode::FORBIDDEN, RESET_EMAIL_FAILED)
                    .with_error(err);
            }
        }

        let url = self.config.password_reset_url(&token);
        let sent = match mail::password_reset_email(&account, &url) {
            Ok(message) => bounded(limit, self.mailer.send(message)).await,
            Err(err) => Err(err),
        };
        if let Err(err) = sent {
            return ServiceResponse::fail(StatusCode::BAD_GATEWAY, RESET_EMAIL_FAILED)
                .with_error(err);
        }

        tracing::info!(account_id = %account.id, %expires_at, "password reset issued");
        ServiceResponse::success(RESET_EMAIL_SENT)
    }

    /// Replace the password of the account holding an unexpired reset token.
    pub async fn reset_password(
        &self,
        raw_token: &str,
        input: ResetPasswordInput,
    ) -> ServiceResponse {
        if input.password != input.password_confirm {
            return ServiceResponse::fail(StatusCode::BAD_REQUEST, PASSWORD_MISMATCH)
                .with_error(AuthError::Validation("password mismatch".to_string()));
        }
        if let Err(errors) = input.validate() {
            return ServiceResponse::from_error(errors.into());
        }

        let digest = match hash_password(&input.password) {
            Ok(digest) => digest,
            Err(err) => {
                return ServiceResponse::fail(StatusCode::INTERNAL_SERVER_ERROR, UPSTREAM_FAILURE)
                    .with_error(err);
            }
        };

        let token = encode_opaque(raw_token);
        match bounded(
            self.config.upstream_timeout,
            self.store.consume_reset_token(&token, &digest),
        )
        .await
        {
            Ok(0) => ServiceResponse::fail(StatusCode::FORBIDDEN, INVALID_OR_EXPIRED)
                .with_error(AuthError::Forbidden("unknown or expired reset token".to_string())),
            Ok(_) => ServiceResponse::success(PASSWORD_UPDATED),
            Err(err) => ServiceResponse::fail(StatusCode::BAD_GATEWAY, UPSTREAM_FAILURE)
                .with_error(err),
        }
    }
}
