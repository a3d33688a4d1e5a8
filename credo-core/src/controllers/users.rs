use axum::{Router, routing::get};

use crate::extractors::CurrentUser;
use crate::response::ServiceResponse;

use super::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

/// Profile of the signed-in account.
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Current account", body = crate::response::EnvelopeBody),
        (status = 401, description = "Missing, invalid or expired access token")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub(crate) async fn me(CurrentUser(account): CurrentUser) -> ServiceResponse {
    ServiceResponse::success("").with_user(account)
}
