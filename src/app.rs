use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::db::Repository;
use crate::error::Result;
use crate::feed::{FeedProbe, HttpFeedProbe};
use crate::index::{IndexService, OperandClient};
use crate::mail::{LogTransport, MailTemplates, MailTransport, PostmarkTransport};
use crate::services::{AccessService, CallbackService, Links, RegistrationService};

/// The collaborators shared by all request handlers.
pub struct Collaborators {
    pub repository: Arc<Repository>,
    pub index: Arc<dyn IndexService>,
    pub mailer: Arc<dyn MailTransport>,
    pub probe: Arc<dyn FeedProbe>,
}

pub struct App {
    pub registration: RegistrationService,
    pub callbacks: CallbackService,
    pub access: AccessService,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        if let Some(parent) = Path::new(&config.db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let repository = Arc::new(Repository::new(&config.db_path).await?);

        let index: Arc<dyn IndexService> = Arc::new(OperandClient::new(
            &config.index_endpoint,
            config.require_index_api_key()?.to_string(),
        )?);

        let mailer: Arc<dyn MailTransport> = match &config.postmark_server_token {
            Some(token) if !token.is_empty() => Arc::new(PostmarkTransport::new(token.clone())?),
            _ => {
                tracing::warn!("No Postmark token configured, emails will only be logged");
                Arc::new(LogTransport)
            }
        };

        let probe: Arc<dyn FeedProbe> = Arc::new(HttpFeedProbe::new()?);

        let collaborators = Collaborators {
            repository,
            index,
            mailer,
            probe,
        };
        Self::with_collaborators(collaborators, config)
    }

    pub fn with_collaborators(c: Collaborators, config: &Config) -> Result<Self> {
        let links = Links::new(config.base_url());
        let templates = Arc::new(MailTemplates::new()?);

        let registration = RegistrationService::new(
            c.repository.clone(),
            c.index.clone(),
            c.probe,
            links.clone(),
            config.index_parent_id.clone(),
        );
        let callbacks = CallbackService::new(
            c.repository.clone(),
            c.index.clone(),
            c.mailer.clone(),
            templates.clone(),
            config.mail_from.clone(),
        );
        let access = AccessService::new(
            c.repository,
            c.index,
            c.mailer,
            templates,
            links,
            config.mail_from.clone(),
        );

        Ok(Self {
            registration,
            callbacks,
            access,
        })
    }
}
