use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::error::AuthError;

/// JSON body extractor whose rejection renders as a `fail` envelope.
///
/// Unlike `axum::Json` it does not insist on a `Content-Type` header.
///
/// ```rust,ignore
/// async fn sign_in(Json(input): Json<SignInInput>) -> ServiceResponse { ... }
/// ```
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let bytes = axum::body::to_bytes(req.into_body(), 64 * 1024)
            .await
            .map_err(|e| AuthError::Validation(format!("Failed to read body: {}", e)))?;

        let value: T = serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::Validation(format!("Invalid JSON: {}", e)))?;

        Ok(Json(value))
    }
}
