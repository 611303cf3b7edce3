use std::sync::Arc;

use serde::Deserialize;
use subtle::ConstantTimeEq;
use tokio::task::JoinHandle;

use crate::db::Repository;
use crate::email::normalize_email;
use crate::error::{AppError, Result};
use crate::index::IndexService;
use crate::mail::{MailTemplates, MailTransport, OutboundEmail};
use crate::models::Alert;

use super::{present, Links};

/// Query parameters accepted by the alert listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertQuery {
    pub trigger_id: Option<String>,
    pub email_address: Option<String>,
    pub email_secret: Option<String>,
}

#[derive(Debug)]
pub enum LoginDispatch {
    /// The login email was handed to a background task.
    Dispatched(JoinHandle<()>),
    /// The address has no account; nothing was sent.
    NoAccount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub row_deleted: bool,
    pub trigger_deleted: bool,
}

pub struct AccessService {
    repository: Arc<Repository>,
    index: Arc<dyn IndexService>,
    mailer: Arc<dyn MailTransport>,
    templates: Arc<MailTemplates>,
    links: Links,
    mail_from: String,
}

impl AccessService {
    pub fn new(
        repository: Arc<Repository>,
        index: Arc<dyn IndexService>,
        mailer: Arc<dyn MailTransport>,
        templates: Arc<MailTemplates>,
        links: Links,
        mail_from: String,
    ) -> Self {
        Self {
            repository,
            index,
            mailer,
            templates,
            links,
            mail_from,
        }
    }

    /// Mails the capability link for `email_address` if it has an account.
    /// The caller learns nothing about whether the address is known; the send
    /// is started before returning but not awaited.
    pub async fn issue_login_link(&self, email_address: Option<&str>) -> Result<LoginDispatch> {
        let Some(address) = present(email_address) else {
            return Err(AppError::validation("Missing emailAddress"));
        };

        let email = normalize_email(address);
        let Some(secret) = self.repository.get_secret(&email).await? else {
            tracing::debug!("Login requested for unknown address");
            return Ok(LoginDispatch::NoAccount);
        };

        let manage_url = self.links.manage_url(&email, &secret);
        let rendered = self.templates.login(&manage_url)?;
        let message = OutboundEmail {
            from: self.mail_from.clone(),
            to: email,
            subject: rendered.subject,
            html_body: rendered.html_body,
        };

        let mailer = self.mailer.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = mailer.send(&message).await {
                tracing::warn!("Failed to send login link to {}: {}", message.to, e);
            }
        });

        Ok(LoginDispatch::Dispatched(handle))
    }

    pub async fn list_alerts(&self, query: &AlertQuery) -> Result<Vec<Alert>> {
        if let Some(trigger_id) = present(query.trigger_id.as_deref()) {
            let alert = self.repository.get_alert(trigger_id).await?;
            return Ok(alert.into_iter().collect());
        }

        let address = present(query.email_address.as_deref());
        let secret = present(query.email_secret.as_deref());
        match (address, secret) {
            (None, None) => Err(AppError::validation("Missing query parameter")),
            (None, Some(_)) => Err(AppError::validation("Missing emailAddress query parameter")),
            (Some(_), None) => Err(AppError::validation("Missing emailSecret query parameter")),
            (Some(address), Some(secret)) => {
                let email = normalize_email(address);
                let stored = self.repository.get_secret(&email).await?;
                if !secret_matches(stored.as_deref(), secret) {
                    return Err(AppError::validation("Invalid emailSecret query parameter"));
                }
                self.repository.get_alerts_for_email(&email).await
            }
        }
    }

    /// Removes the trigger and the alert row concurrently. Each side is
    /// attempted regardless of the other; a failed trigger removal is logged
    /// and leaves the trigger orphaned.
    pub async fn delete_alert(&self, trigger_id: Option<&str>) -> Result<DeleteOutcome> {
        let Some(trigger_id) = present(trigger_id) else {
            return Err(AppError::validation("Missing triggerId query parameter"));
        };

        let (trigger_result, row_result) = tokio::join!(
            self.index.delete_trigger(trigger_id),
            self.repository.delete_alert(trigger_id),
        );

        let trigger_deleted = match trigger_result {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!("Failed to delete trigger {}: {}", trigger_id, e);
                false
            }
        };
        let row_deleted = row_result?;

        tracing::info!(
            "Deleted alert {} (row: {}, trigger: {})",
            trigger_id,
            row_deleted,
            trigger_deleted
        );
        Ok(DeleteOutcome {
            row_deleted,
            trigger_deleted,
        })
    }
}

fn secret_matches(stored: Option<&str>, given: &str) -> bool {
    match stored {
        Some(stored) => bool::from(stored.as_bytes().ct_eq(given.as_bytes())),
        None => false,
    }
}
