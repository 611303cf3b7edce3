use serde::{Deserialize, Serialize};

/// Body the index service posts when a trigger fires. Fields are optional so a
/// malformed delivery can be answered with 400 instead of a parse rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    pub trigger_id: Option<String>,
    pub matches: Option<Vec<MatchEvent>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    pub content: String,
    pub object_id: String,
    #[serde(default)]
    pub score: f64,
}
