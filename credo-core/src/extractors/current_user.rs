use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;

use crate::controllers::auth::ACCESS_COOKIE;
use crate::error::AuthError;
use crate::models::Account;
use crate::services::SessionService;

/// The account behind a valid access token.
///
/// The token is read from `Authorization: Bearer <token>` first, then from the
/// `access_token` cookie. Rejects with 401 when neither is present, the token
/// does not validate, or the account no longer exists.
///
/// ```rust,ignore
/// async fn me(CurrentUser(account): CurrentUser) -> ServiceResponse { ... }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Account);

impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<SessionService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string());

        let token = match bearer {
            Some(token) if !token.is_empty() => token,
            _ => CookieJar::from_headers(&parts.headers)
                .get(ACCESS_COOKIE)
                .map(|c| c.value().to_string())
                .filter(|t| !t.is_empty())
                .ok_or_else(|| AuthError::Unauthorized("You are not logged in".to_string()))?,
        };

        let session = Arc::<SessionService>::from_ref(state);
        let account = session.authenticate(&token).await?;
        Ok(CurrentUser(account))
    }
}
