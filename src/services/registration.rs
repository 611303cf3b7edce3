use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::db::Repository;
use crate::email::{is_valid_email, normalize_email};
use crate::error::{AppError, Result};
use crate::feed::{FeedProbe, MAX_FEED_URL_LEN};
use crate::index::IndexService;
use crate::models::{Alert, Feed, NewIndexObject, NewTrigger};

use super::Links;

pub const MAX_QUERY_LEN: usize = 280;
pub const MIN_THRESHOLD: f64 = 0.4;
pub const MAX_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub feed_url: String,
    pub trigger_query: String,
    pub trigger_threshold: f64,
    pub destination_email: String,
}

impl RegistrationRequest {
    /// Input checks that run before any side effect.
    pub fn validate(&self) -> Result<()> {
        let query_len = self.trigger_query.chars().count();
        if query_len == 0 || query_len > MAX_QUERY_LEN {
            return Err(AppError::validation("Invalid trigger query"));
        }
        if !is_valid_email(&self.destination_email) {
            return Err(AppError::validation("Invalid destination email address"));
        }
        if !(MIN_THRESHOLD..=MAX_THRESHOLD).contains(&self.trigger_threshold) {
            return Err(AppError::validation(format!(
                "Invalid trigger threshold, must be between {} and {}",
                MIN_THRESHOLD, MAX_THRESHOLD
            )));
        }
        Ok(())
    }
}

pub struct RegistrationService {
    repository: Arc<Repository>,
    index: Arc<dyn IndexService>,
    probe: Arc<dyn FeedProbe>,
    links: Links,
    parent_id: Option<String>,
}

impl RegistrationService {
    pub fn new(
        repository: Arc<Repository>,
        index: Arc<dyn IndexService>,
        probe: Arc<dyn FeedProbe>,
        links: Links,
        parent_id: Option<String>,
    ) -> Self {
        Self {
            repository,
            index,
            probe,
            links,
            parent_id,
        }
    }

    /// Registers an alert and returns the id of its new trigger.
    pub async fn register(&self, request: &RegistrationRequest) -> Result<String> {
        request.validate()?;

        let object_id = self.resolve_feed_object(&request.feed_url).await?;

        let trigger = NewTrigger::webhook(
            &request.trigger_query,
            &object_id,
            &self.links.callback_url(),
            request.trigger_threshold,
        );
        let trigger = self.index.create_trigger(&trigger).await.map_err(|e| {
            tracing::warn!("Failed to create trigger for {}: {}", request.feed_url, e);
            AppError::Upstream("Failed to create trigger".to_string())
        })?;
        tracing::debug!(
            "Created trigger {} (threshold {}) for \"{}\"",
            trigger.id,
            trigger.matching_threshold,
            trigger.query
        );

        let email = normalize_email(&request.destination_email);
        self.repository
            .insert_alert(Alert {
                feed_url: request.feed_url.clone(),
                trigger_id: trigger.id.clone(),
                destination_email: email.clone(),
                query: request.trigger_query.clone(),
            })
            .await?;

        let secret = Uuid::new_v4().simple().to_string();
        if self.repository.insert_secret_if_absent(&email, &secret).await? {
            tracing::info!("Provisioned login secret for {}", email);
        }

        tracing::info!("Registered alert {} on {}", trigger.id, request.feed_url);
        Ok(trigger.id)
    }

    /// Returns the index object for `feed_url`, registering the feed on first use.
    async fn resolve_feed_object(&self, feed_url: &str) -> Result<String> {
        if let Some(feed) = self.repository.get_feed(feed_url).await? {
            return Ok(feed.object_id);
        }

        if feed_url.len() > MAX_FEED_URL_LEN || !self.probe.is_feed(feed_url).await {
            return Err(AppError::validation("Invalid feed URL"));
        }

        let object = NewIndexObject::feed(feed_url, self.parent_id.clone());
        let object = self.index.create_object(&object).await.map_err(|e| {
            tracing::warn!("Failed to create object for {}: {}", feed_url, e);
            AppError::Upstream("Failed to create object".to_string())
        })?;

        let stored = self
            .repository
            .insert_feed(Feed {
                url: feed_url.to_string(),
                object_id: object.id.clone(),
            })
            .await?;
        if stored.object_id != object.id {
            tracing::warn!(
                "Feed {} was registered concurrently, object {} is orphaned",
                feed_url,
                object.id
            );
        }

        Ok(stored.object_id)
    }
}
