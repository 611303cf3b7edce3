use serde::{Deserialize, Serialize};

/// Object kind the index service uses for RSS feed sources.
pub const FEED_OBJECT_KIND: &str = "rss";

const WEBHOOK_CALLBACK_KIND: &str = "webhook";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexObject {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedSourceMetadata {
    rss_url: String,
}

/// Metadata attached to an entry the index service extracted from a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItemMetadata {
    pub html: String,
    pub title: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectMetadata {
    FeedSource { rss_url: String },
    FeedItem(FeedItemMetadata),
    Unrecognized(serde_json::Value),
}

impl IndexObject {
    /// Interprets the untyped metadata according to the object kind.
    pub fn metadata(&self) -> ObjectMetadata {
        if self.kind == FEED_OBJECT_KIND {
            let source = serde_json::from_value::<FeedSourceMetadata>(self.metadata.clone());
            if let Ok(source) = source {
                return ObjectMetadata::FeedSource {
                    rss_url: source.rss_url,
                };
            }
        } else if let Ok(item) = serde_json::from_value::<FeedItemMetadata>(self.metadata.clone()) {
            return ObjectMetadata::FeedItem(item);
        }
        ObjectMetadata::Unrecognized(self.metadata.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIndexObject {
    #[serde(rename = "type")]
    pub kind: String,
    pub metadata: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl NewIndexObject {
    pub fn feed(feed_url: &str, parent_id: Option<String>) -> Self {
        let metadata = FeedSourceMetadata {
            rss_url: feed_url.to_string(),
        };
        Self {
            kind: FEED_OBJECT_KIND.to_string(),
            metadata: serde_json::to_value(metadata).unwrap_or_default(),
            label: Some(feed_url.to_string()),
            parent_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerFilter {
    #[serde(rename = "_object")]
    pub object: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerCallback {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrigger {
    pub query: String,
    pub filter: TriggerFilter,
    pub callback_kind: String,
    pub callback_metadata: TriggerCallback,
    pub matching_threshold: f64,
}

impl NewTrigger {
    /// A trigger matching new content under `object_id`, reported to `callback_url`.
    pub fn webhook(query: &str, object_id: &str, callback_url: &str, threshold: f64) -> Self {
        Self {
            query: query.to_string(),
            filter: TriggerFilter {
                object: object_id.to_string(),
            },
            callback_kind: WEBHOOK_CALLBACK_KIND.to_string(),
            callback_metadata: TriggerCallback {
                url: callback_url.to_string(),
            },
            matching_threshold: threshold,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub id: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub matching_threshold: f64,
}
