use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::{EmailMessage, MailError, Mailer};

/// Keeps every message in memory. Used by the test harness.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail with [`MailError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or_default()
    }

    /// The last path segment of the most recent link sent to `to`.
    ///
    /// That segment is the raw verification code or reset token.
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        let sent = self.sent.lock().ok()?;
        let message = sent.iter().rev().find(|m| m.to == to)?;
        message.link.rsplit('/').next().map(str::to_string)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Unavailable("recording mailer switched off".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| MailError::Unavailable("recording mailer lock poisoned".to_string()))?
            .push(message);
        Ok(())
    }
}
