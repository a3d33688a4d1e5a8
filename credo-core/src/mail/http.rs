use async_trait::async_trait;
use serde::Serialize;

use super::{EmailMessage, MailError, Mailer};
use crate::config::MailConfig;

/// Sends mail through a JSON transactional-mail API (Brevo-compatible payload).
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    sender: Party,
}

#[derive(Debug, Clone, Serialize)]
struct Party {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    sender: &'a Party,
    to: [Party; 1],
    subject: &'a str,
    html_content: &'a str,
    text_content: &'a str,
}

impl HttpMailer {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        sender_email: impl Into<String>,
        sender_name: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            sender: Party {
                email: sender_email.into(),
                name: sender_name,
            },
        }
    }

    /// Build from configuration; `None` when the API URL or key is absent.
    pub fn from_config(config: &MailConfig) -> Option<Self> {
        Some(Self::new(
            config.api_url.clone()?,
            config.api_key.clone()?,
            config.sender_email.clone(),
            config.sender_name.clone(),
        ))
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let request = SendRequest {
            sender: &self.sender,
            to: [Party {
                email: message.to.clone(),
                name: Some(message.to_name.clone()),
            }],
            subject: &message.subject,
            html_content: &message.html,
            text_content: &message.text,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %message.to, subject = %message.subject, "email dispatched");
        Ok(())
    }
}
