//! Service layer: the sign-in/token state machine and the verification/reset
//! lifecycle. Every public operation returns a
//! [`ServiceResponse`](crate::response::ServiceResponse).

use std::future::Future;
use std::time::Duration;

use tokio::time::error::Elapsed;

pub mod lifecycle;
pub mod session;

pub use lifecycle::LifecycleService;
pub use session::SessionService;

/// Shown for both an unknown email and a wrong password.
pub const INVALID_CREDENTIALS: &str = "Invalid Email or Password";
pub const NOT_VERIFIED_SIGN_IN: &str =
    "You have not verified the account, please verify your email to login";
pub const REFRESH_FAILED: &str = "could not refresh access token";
pub const UPSTREAM_FAILURE: &str = "Something went wrong, please try again later";
pub const PASSWORD_MISMATCH: &str = "Passwords do not match";
pub const EMAIL_TAKEN: &str = "User with that email already exists";
pub const VERIFIED: &str = "Successfully Verified";
pub const INVALID_CODE: &str = "Invalid verification code or user doesn't exist";
/// Returned by forgot-password whether or not the email is registered.
pub const RESET_EMAIL_SENT: &str = "You will receive a reset email if user with that email exist";
pub const ACCOUNT_NOT_VERIFIED: &str = "Account not verified";
pub const RESET_EMAIL_FAILED: &str = "There was an error sending reset email";
pub const INVALID_OR_EXPIRED: &str = "Invalid or expired token";
pub const PASSWORD_UPDATED: &str = "Password updated successfully. Please Login with new password";

/// Emails are matched trimmed and lowercased in every flow.
pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub(crate) fn verification_sent(email: &str) -> String {
    format!("An email with the verification code has been sent to {}", email)
}

/// Run a store or mail call under the upstream time limit.
pub(crate) async fn bounded<T, E, F>(limit: Duration, call: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<Elapsed>,
{
    tokio::time::timeout(limit, call).await?
}
