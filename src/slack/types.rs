// Slack Web API payload types.
//
// Messages keep every field Slack sends (via the flattened `extra` map) so
// the stored document is the full payload, not just the fields we rank on.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single reaction on a message: the emoji name, how many times it was
/// applied, and who applied it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub name: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub users: Vec<String>,
}

/// A message as returned by `conversations.history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackMessage {
    /// Slack's message timestamp, e.g. "1577836800.000200". Unique per channel.
    pub ts: String,
    /// Author. Absent for bot and system messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Vec<Reaction>>,
    /// Everything else Slack sent (text, type, attachments, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SlackMessage {
    /// A bare message with only a timestamp and optional author.
    pub fn new(ts: impl Into<String>, user: Option<&str>) -> Self {
        Self {
            ts: ts.into(),
            user: user.map(String::from),
            reactions: None,
            extra: Map::new(),
        }
    }

    /// Builder-style helper for attaching reactions.
    pub fn with_reactions(mut self, reactions: Vec<Reaction>) -> Self {
        self.reactions = Some(reactions);
        self
    }
}

/// One page of channel history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryPage {
    /// Newest first, as Slack returns them.
    #[serde(default)]
    pub messages: Vec<SlackMessage>,
    #[serde(default)]
    pub has_more: bool,
}

/// Parameters for one `conversations.history` call.
///
/// `oldest` and `latest` are exclusive bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRequest {
    pub channel: String,
    pub oldest: String,
    pub latest: Option<String>,
    pub limit: u32,
}

/// Response from `team.info`.
#[derive(Debug, Deserialize)]
pub struct TeamInfoResponse {
    pub team: TeamInfo,
}

#[derive(Debug, Deserialize)]
pub struct TeamInfo {
    /// Workspace subdomain, used for permalinks (`{domain}.slack.com`).
    pub domain: String,
}
