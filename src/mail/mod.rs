mod postmark;
mod templates;

use async_trait::async_trait;

use crate::error::Result;

pub use postmark::PostmarkTransport;
pub use templates::MailTemplates;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Outbound transactional mail. Delivery is not confirmed; `Ok` only means the
/// transport accepted the message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<()>;
}

/// Writes messages to the log instead of delivering them. Used when no
/// transport credential is configured.
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Mail transport not configured, message body:\n{}",
            email.html_body
        );
        Ok(())
    }
}
