use serde::{Deserialize, Serialize};

/// A stored alert. Serializes as the listing projection returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub feed_url: String,
    pub trigger_id: String,
    pub destination_email: String,
    pub query: String,
}
