use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use url::Url;

pub const MAX_FEED_URL_LEN: usize = 512;

/// Lightweight existence check run before a feed is registered for the first time.
#[async_trait]
pub trait FeedProbe: Send + Sync {
    async fn is_feed(&self, url: &str) -> bool;
}

pub struct HttpFeedProbe {
    client: Client,
}

impl HttpFeedProbe {
    pub fn new() -> crate::error::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("rss-alert/1.0")
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedProbe for HttpFeedProbe {
    async fn is_feed(&self, url: &str) -> bool {
        let parsed = match Url::parse(url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => u,
            _ => {
                tracing::debug!("Rejecting non-http feed URL {}", url);
                return false;
            }
        };

        // HEAD keeps the check cheap; redirects are followed by the client
        let response = match self
            .client
            .head(parsed)
            .header(ACCEPT, "application/rss+xml")
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Invalid feed URL: {} ({})", url, e);
                return false;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Invalid feed URL: {} ({}): {}", url, status, body);
            return false;
        }

        true
    }
}
