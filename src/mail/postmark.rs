use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};

use super::{MailTransport, OutboundEmail};

const POSTMARK_API_URL: &str = "https://api.postmarkapp.com/email";
const MESSAGE_STREAM: &str = "outbound";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_body: Option<String>,
    message_stream: &'a str,
}

impl<'a> SendEmailRequest<'a> {
    fn new(email: &'a OutboundEmail) -> Self {
        // Plain-text alternative for clients that don't render HTML
        let text_body = html2text::from_read(email.html_body.as_bytes(), 80)
            .ok()
            .filter(|t| !t.trim().is_empty());

        Self {
            from: &email.from,
            to: &email.to,
            subject: &email.subject,
            html_body: &email.html_body,
            text_body,
            message_stream: MESSAGE_STREAM,
        }
    }
}

pub struct PostmarkTransport {
    client: Client,
    server_token: String,
}

impl PostmarkTransport {
    pub fn new(server_token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            server_token,
        })
    }
}

#[async_trait]
impl MailTransport for PostmarkTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        let response = self
            .client
            .post(POSTMARK_API_URL)
            .header("Accept", "application/json")
            .header("X-Postmark-Server-Token", &self.server_token)
            .json(&SendEmailRequest::new(email))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Mail(format!("API error: {}", error_text)));
        }

        tracing::debug!("Sent \"{}\" to {}", email.subject, email.to);
        Ok(())
    }
}
