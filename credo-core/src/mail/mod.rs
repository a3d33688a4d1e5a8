//! Outbound email capability.
//!
//! Services only know the [`Mailer`] trait. The concrete transport is chosen
//! from configuration when the app is built: [`HttpMailer`] for a transactional
//! mail API, [`LogMailer`] in development, [`RecordingMailer`] in tests.

use askama::Template;
use async_trait::async_trait;
use thiserror::Error;

use crate::models::Account;

pub mod http;
pub mod log;
pub mod memory;

pub use http::HttpMailer;
pub use log::LogMailer;
pub use memory::RecordingMailer;

pub const VERIFICATION_SUBJECT: &str = "Please verify your account";
pub const PASSWORD_RESET_SUBJECT: &str = "Your password reset link (valid for 15 minutes)";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail transport unavailable: {0}")]
    Unavailable(String),

    #[error("failed to render email: {0}")]
    Template(#[from] askama::Error),

    #[error("mail dispatch timed out")]
    Timeout(#[from] tokio::time::error::Elapsed),
}

/// A rendered message ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub html: String,
    pub text: String,
    /// The action link embedded in the body.
    pub link: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

#[derive(Template)]
#[template(path = "verification.html")]
struct VerificationHtml<'a> {
    first_name: &'a str,
    url: &'a str,
}

#[derive(Template)]
#[template(path = "password_reset.html")]
struct PasswordResetHtml<'a> {
    first_name: &'a str,
    url: &'a str,
}

/// Message asking a new account holder to confirm their address.
///
/// The name is user input; the HTML part escapes it.
pub fn verification_email(account: &Account, url: &str) -> Result<EmailMessage, MailError> {
    let first_name = account.first_name();
    let html = VerificationHtml { first_name, url }.render()?;
    Ok(EmailMessage {
        to: account.email.clone(),
        to_name: account.name.clone(),
        subject: VERIFICATION_SUBJECT.to_string(),
        html,
        text: format!(
            "Hi {first_name},\n\n\
             Please verify your account to be able to login:\n{url}\n\n\
             Good luck! Hope it works.\n"
        ),
        link: url.to_string(),
    })
}

/// Message carrying a time-limited password reset link.
pub fn password_reset_email(account: &Account, url: &str) -> Result<EmailMessage, MailError> {
    let first_name = account.first_name();
    let html = PasswordResetHtml { first_name, url }.render()?;
    Ok(EmailMessage {
        to: account.email.clone(),
        to_name: account.name.clone(),
        subject: PASSWORD_RESET_SUBJECT.to_string(),
        html,
        text: format!(
            "Hi {first_name},\n\n\
             Forgot your password? Follow the link below to choose a new one:\n{url}\n\n\
             If you didn't forget your password, please ignore this email.\n"
        ),
        link: url.to_string(),
    })
}
