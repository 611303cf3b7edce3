use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{IndexObject, NewIndexObject, NewTrigger, Trigger};

use super::IndexService;

#[derive(Debug, Deserialize)]
struct DeleteTriggerResponse {
    deleted: bool,
}

/// HTTP client for the v3 objects/triggers API.
pub struct OperandClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl OperandClient {
    pub fn new(endpoint: &str, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("rss-alert/1.0")
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v3/{}", self.endpoint, path)
    }

    async fn check(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        Err(AppError::Upstream(format!("HTTP {}: {}", status, error_text)))
    }
}

#[async_trait]
impl IndexService for OperandClient {
    async fn create_object(&self, object: &NewIndexObject) -> Result<IndexObject> {
        let response = self
            .client
            .post(self.url("objects"))
            .header("Authorization", &self.api_key)
            .json(object)
            .send()
            .await?;

        let created: IndexObject = Self::check(response).await?.json().await?;
        tracing::debug!("Created index object {} ({})", created.id, created.kind);
        Ok(created)
    }

    async fn get_object(&self, id: &str) -> Result<IndexObject> {
        let response = self
            .client
            .get(self.url(&format!("objects/{}", urlencoding::encode(id))))
            .header("Authorization", &self.api_key)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn create_trigger(&self, trigger: &NewTrigger) -> Result<Trigger> {
        let response = self
            .client
            .post(self.url("triggers"))
            .header("Authorization", &self.api_key)
            .json(trigger)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete_trigger(&self, id: &str) -> Result<bool> {
        let response = self
            .client
            .delete(self.url(&format!("triggers/{}", urlencoding::encode(id))))
            .header("Authorization", &self.api_key)
            .send()
            .await?;

        let body: DeleteTriggerResponse = Self::check(response).await?.json().await?;
        Ok(body.deleted)
    }
}
