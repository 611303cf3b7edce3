use serde::Serialize;

use crate::models::{IndexObject, ObjectMetadata};

/// One object's worth of matches in a digest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigestSection {
    pub title: String,
    pub link: Option<String>,
    pub snippets: Vec<String>,
}

impl DigestSection {
    /// Builds a section from the fetched object, falling back to the bare
    /// object id when metadata is missing or has an unexpected shape.
    pub fn new(object_id: &str, object: Option<&IndexObject>, snippets: Vec<String>) -> Self {
        let (title, link) = match object.map(IndexObject::metadata) {
            Some(ObjectMetadata::FeedItem(item)) => {
                let title = item
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .or_else(|| item.url.clone())
                    .unwrap_or_else(|| object_id.to_string());
                (title, item.url)
            }
            Some(ObjectMetadata::FeedSource { rss_url }) => (rss_url.clone(), Some(rss_url)),
            Some(ObjectMetadata::Unrecognized(_)) | None => (object_id.to_string(), None),
        };

        Self {
            title,
            link,
            snippets,
        }
    }
}

/// Template context for one digest email.
#[derive(Debug, Clone, Serialize)]
pub struct Digest {
    pub feed_url: String,
    pub sections: Vec<DigestSection>,
}
