use std::sync::Arc;

use axum::http::StatusCode;
use validator::Validate;

use super::{
    INVALID_CREDENTIALS, NOT_VERIFIED_SIGN_IN, REFRESH_FAILED, UPSTREAM_FAILURE, bounded,
    normalize_email,
};
use crate::auth::{TokenKeys, create_token, validate_token, verify_password};
use crate::config::Config;
use crate::error::AuthError;
use crate::models::{Account, SignInInput};
use crate::response::ServiceResponse;
use crate::store::{AccountStore, StoreError};

/// Sign-in, token refresh, logout and access-token authentication.
///
/// Access and refresh tokens are signed with independent key pairs, both
/// parsed once at construction.
pub struct SessionService {
    store: Arc<dyn AccountStore>,
    config: Arc<Config>,
    access_keys: TokenKeys,
    refresh_keys: TokenKeys,
}

impl SessionService {
    pub fn new(store: Arc<dyn AccountStore>, config: Arc<Config>) -> Result<Self, AuthError> {
        let access_keys = config.access_token.keys()?;
        let refresh_keys = config.refresh_token.keys()?;
        Ok(Self {
            store,
            config,
            access_keys,
            refresh_keys,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Look up, check verification, check password, issue both tokens.
    ///
    /// An unknown email and a wrong password produce the same 400 response.
    pub async fn sign_in(&self, input: SignInInput) -> ServiceResponse {
        if let Err(errors) = input.validate() {
            return ServiceResponse::from_error(errors.into());
        }

        let lookup = bounded(
            self.config.upstream_timeout,
            self.store.find_by_email(&normalize_email(&input.email)),
        )
        .await;

        let account = match lookup {
            Ok(account) => account,
            Err(StoreError::NotFound) => {
                return ServiceResponse::fail(StatusCode::BAD_REQUEST, INVALID_CREDENTIALS)
                    .with_error(AuthError::InvalidCredentials);
            }
            Err(err) => {
                return ServiceResponse::fail(StatusCode::BAD_GATEWAY, UPSTREAM_FAILURE)
                    .with_error(err);
            }
        };

        if !account.verified {
            return ServiceResponse::fail(StatusCode::UNAUTHORIZED, NOT_VERIFIED_SIGN_IN)
                .with_error(AuthError::Unverified);
        }

        match verify_password(&input.password, &account.password_digest) {
            Ok(true) => {}
            Ok(false) => {
                return ServiceResponse::fail(StatusCode::BAD_REQUEST, INVALID_CREDENTIALS)
                    .with_error(AuthError::InvalidCredentials);
            }
            Err(err) => {
                return ServiceResponse::fail(StatusCode::INTERNAL_SERVER_ERROR, UPSTREAM_FAILURE)
                    .with_error(err);
            }
        }

        let access_ttl = self.config.access_token.expires_in;
        let refresh_ttl = self.config.refresh_token.expires_in;
        let tokens = create_token(access_ttl, &account.id, &self.access_keys).and_then(|access| {
            create_token(refresh_ttl, &account.id, &self.refresh_keys)
                .map(|refresh| (access, refresh))
        });

        match tokens {
            Ok((access, refresh)) => {
                tracing::info!(account_id = %account.id, "signed in");
                ServiceResponse::success("")
                    .with_user(account)
                    .with_access_token(access)
                    .with_refresh_token(refresh)
            }
            Err(err) => {
                ServiceResponse::fail(StatusCode::INTERNAL_SERVER_ERROR, UPSTREAM_FAILURE)
                    .with_error(err)
            }
        }
    }

    /// Mint a new access token from a refresh token. The refresh token is not rotated.
    ///
    /// Every failure (missing token, bad signature, expiry, account gone, store
    /// error) is the same 403 to the client.
    pub async fn refresh_access_token(&self, refresh_token: Option<&str>) -> ServiceResponse {
        match self.try_refresh(refresh_token).await {
            Ok((account, access)) => ServiceResponse::success("")
                .with_user(account)
                .with_access_token(access),
            Err(err) => ServiceResponse::fail(StatusCode::FORBIDDEN, REFRESH_FAILED)
                .with_error(err),
        }
    }

    async fn try_refresh(
        &self,
        refresh_token: Option<&str>,
    ) -> Result<(Account, String), AuthError> {
        let token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::Forbidden("missing refresh token".to_string()))?;

        let claims = validate_token(token, &self.refresh_keys)?;
        let account =
            bounded(self.config.upstream_timeout, self.store.find_by_id(&claims.sub)).await?;
        let access_ttl = self.config.access_token.expires_in;
        let access = create_token(access_ttl, &account.id, &self.access_keys)?;
        Ok((account, access))
    }

    /// Stateless: tokens stay valid until they expire; the transport clears the cookies.
    pub fn logout(&self) -> ServiceResponse {
        ServiceResponse::success("")
    }

    /// Resolve an access token to its account.
    pub async fn authenticate(&self, access_token: &str) -> Result<Account, AuthError> {
        let claims = validate_token(access_token, &self.access_keys)
            .map_err(|_| AuthError::Unauthorized("invalid or expired access token".to_string()))?;

        match bounded(self.config.upstream_timeout, self.store.find_by_id(&claims.sub)).await {
            Ok(account) => Ok(account),
            Err(StoreError::NotFound) => Err(AuthError::Unauthorized(
                "the user belonging to this token no longer exists".to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }
}
