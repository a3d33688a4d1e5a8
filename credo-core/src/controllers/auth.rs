use axum::extract::{Path, State};
use axum::Router;
use axum::routing::{get, patch, post};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::CookieConfig;
use crate::extractors::{CurrentUser, Json};
use crate::models::{ForgotPasswordInput, ResetPasswordInput, SignInInput, SignUpInput};
use crate::response::{EnvelopeBody, ServiceResponse};

use super::AppState;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
pub const LOGGED_IN_COOKIE: &str = "logged_in";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", get(refresh))
        .route("/logout", get(logout))
        .route("/verifyemail/{code}", get(verify_email))
        .route("/forgotpassword", post(forgot_password))
        .route("/resetpassword/{token}", patch(reset_password))
}

// ── Cookie contract ──

fn session_cookie(
    name: &'static str,
    value: String,
    max_age_secs: i64,
    http_only: bool,
    config: &CookieConfig,
) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, value))
        .path("/")
        .http_only(http_only)
        .secure(config.secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build();
    if let Some(domain) = &config.domain {
        cookie.set_domain(domain.clone());
    }
    cookie
}

/// The non-HttpOnly flag a browser script can read to tell it is signed in.
fn logged_in_cookie(max_age_secs: i64, config: &CookieConfig) -> Cookie<'static> {
    session_cookie(LOGGED_IN_COOKIE, "true".to_string(), max_age_secs, false, config)
}

/// Overwrite all three session cookies with expired empty values.
fn clear_session_cookies(jar: CookieJar, config: &CookieConfig) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, String::new(), -1, true, config))
        .add(session_cookie(REFRESH_COOKIE, String::new(), -1, true, config))
        .add(session_cookie(LOGGED_IN_COOKIE, String::new(), -1, false, config))
}

// ── Handlers ──

/// Register a new account and send its verification email.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = SignUpInput,
    responses(
        (status = 200, description = "Verification email sent", body = EnvelopeBody),
        (status = 400, description = "Invalid input or passwords do not match"),
        (status = 409, description = "Email already registered"),
        (status = 502, description = "Store or mail failure")
    ),
    tag = "auth"
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    Json(input): Json<SignUpInput>,
) -> ServiceResponse {
    state.lifecycle.sign_up(input).await
}

/// Sign in and receive an access/refresh token pair, also set as cookies.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = SignInInput,
    responses(
        (status = 200, description = "Signed in", body = EnvelopeBody),
        (status = 400, description = "Invalid email or password"),
        (status = 401, description = "Account not verified")
    ),
    tag = "auth"
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<SignInInput>,
) -> (CookieJar, ServiceResponse) {
    let response = state.session.sign_in(input).await;

    let Some((access, refresh)) = response
        .access_token
        .clone()
        .zip(response.refresh_token.clone())
    else {
        return (jar, response);
    };

    let config = &state.config;
    let access_age = config.access_token.max_age_secs();
    let refresh_age = config.refresh_token.max_age_secs();
    let jar = jar
        .add(session_cookie(ACCESS_COOKIE, access, access_age, true, &config.cookie))
        .add(session_cookie(REFRESH_COOKIE, refresh, refresh_age, true, &config.cookie))
        .add(logged_in_cookie(access_age, &config.cookie));

    (jar, response)
}

/// Mint a new access token from the `refresh_token` cookie.
#[utoipa::path(
    get,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "New access token issued", body = EnvelopeBody),
        (status = 403, description = "Could not refresh access token")
    ),
    tag = "auth"
)]
pub(crate) async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, ServiceResponse) {
    let refresh_token = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());
    let response = state
        .session
        .refresh_access_token(refresh_token.as_deref())
        .await;

    let Some(access) = response.access_token.clone() else {
        return (jar, response);
    };

    let config = &state.config;
    let access_age = config.access_token.max_age_secs();
    let jar = jar
        .add(session_cookie(ACCESS_COOKIE, access, access_age, true, &config.cookie))
        .add(logged_in_cookie(access_age, &config.cookie));

    (jar, response)
}

/// Clear the session cookies. Issued tokens stay valid until they expire.
#[utoipa::path(
    get,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Cookies cleared", body = EnvelopeBody),
        (status = 401, description = "Not logged in")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub(crate) async fn logout(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    jar: CookieJar,
) -> (CookieJar, ServiceResponse) {
    tracing::info!(account_id = %account.id, "logged out");
    let jar = clear_session_cookies(jar, &state.config.cookie);
    (jar, state.session.logout())
}

/// Confirm an email address with the code from the verification link.
#[utoipa::path(
    get,
    path = "/api/auth/verifyemail/{code}",
    params(("code" = String, Path, description = "Raw verification code from the email")),
    responses(
        (status = 200, description = "Account verified", body = EnvelopeBody),
        (status = 403, description = "Invalid verification code"),
        (status = 502, description = "Store failure")
    ),
    tag = "auth"
)]
pub(crate) async fn verify_email(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ServiceResponse {
    state.lifecycle.verify_email(&code).await
}

/// Request a password reset link.
#[utoipa::path(
    post,
    path = "/api/auth/forgotpassword",
    request_body = ForgotPasswordInput,
    responses(
        (status = 200, description = "Reset email sent if the account exists", body = EnvelopeBody),
        (status = 401, description = "Account not verified"),
        (status = 403, description = "Reset could not be recorded"),
        (status = 502, description = "Store or mail failure")
    ),
    tag = "auth"
)]
pub(crate) async fn forgot_password(
    State(state): State<AppState>,
    Json(input): Json<ForgotPasswordInput>,
) -> ServiceResponse {
    state.lifecycle.forgot_password(input).await
}

/// Choose a new password with the token from the reset link.
#[utoipa::path(
    patch,
    path = "/api/auth/resetpassword/{token}",
    params(("token" = String, Path, description = "Raw reset token from the email")),
    request_body = ResetPasswordInput,
    responses(
        (status = 200, description = "Password updated, cookies cleared", body = EnvelopeBody),
        (status = 400, description = "Invalid input or passwords do not match"),
        (status = 403, description = "Invalid or expired token"),
        (status = 502, description = "Store failure")
    ),
    tag = "auth"
)]
pub(crate) async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    jar: CookieJar,
    Json(input): Json<ResetPasswordInput>,
) -> (CookieJar, ServiceResponse) {
    let response = state.lifecycle.reset_password(&token, input).await;
    if !response.is_success() {
        return (jar, response);
    }
    (clear_session_cookies(jar, &state.config.cookie), response)
}
