use serde::{Deserialize, Serialize};

/// Mapping from a feed URL to the index object registered for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub url: String,
    pub object_id: String,
}
