use std::sync::Arc;

use axum::extract::FromRef;
use axum::{Router, routing::get};

use crate::config::Config;
use crate::response::ServiceResponse;
use crate::services::{LifecycleService, SessionService};

pub mod auth;
pub mod users;

/// Shared application state available in all handlers.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<SessionService>,
    pub lifecycle: Arc<LifecycleService>,
}

/// Every API route, ready to receive the state.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/healthchecker", get(health_checker))
        .nest("/api/auth", auth::routes())
        .nest("/api/users", users::routes())
}

#[utoipa::path(
    get,
    path = "/api/healthchecker",
    responses(
        (status = 200, description = "Server is up", body = crate::response::EnvelopeBody)
    ),
    tag = "health"
)]
pub(crate) async fn health_checker() -> ServiceResponse {
    ServiceResponse::success("server connected")
}
