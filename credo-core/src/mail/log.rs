use async_trait::async_trait;

use super::{EmailMessage, MailError, Mailer};

/// Development transport: writes each message to the log instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            link = %message.link,
            "email (log transport)"
        );
        tracing::debug!(body = %message.text, "email body");
        Ok(())
    }
}
