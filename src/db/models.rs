// Data models — the message documents that flow between sync, storage, and
// the leaderboard.
//
// These are separate from the backend queries so other modules can use them
// without depending on rusqlite or sqlx directly.

use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::slack::types::SlackMessage;

/// A Slack message annotated with the channel it was synced from.
///
/// `channel_id` and `channel_name` aren't part of Slack's history payload;
/// the sync engine adds them before storing. (channel_id, ts) is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub channel_id: String,
    pub channel_name: String,
    #[serde(flatten)]
    pub message: SlackMessage,
}

impl StoredMessage {
    pub fn new(channel_id: &str, channel_name: &str, message: SlackMessage) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            channel_name: channel_name.to_string(),
            message,
        }
    }

    pub fn ts(&self) -> &str {
        &self.message.ts
    }

    pub fn user(&self) -> Option<&str> {
        self.message.user.as_deref()
    }

    /// The message timestamp as seconds since the epoch.
    pub fn ts_value(&self) -> Result<f64> {
        parse_ts(&self.message.ts)
    }

    /// Every distinct user who reacted, across all reaction types.
    ///
    /// Someone who left three different emoji counts once.
    pub fn reacting_users(&self) -> HashSet<&str> {
        self.message
            .reactions
            .iter()
            .flatten()
            .flat_map(|r| r.users.iter().map(String::as_str))
            .collect()
    }

    /// Whether the message carries at least one reaction.
    pub fn has_reactions(&self) -> bool {
        self.message
            .reactions
            .as_ref()
            .is_some_and(|r| !r.is_empty())
    }

    /// Reactions serialized for the `reactions` column (None when absent).
    pub fn reactions_json(&self) -> Result<Option<String>> {
        self.message
            .reactions
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize reactions")
    }

    /// The full annotated document as JSON.
    pub fn document_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize message document")
    }

    /// Parse a document previously produced by `document_json`.
    pub fn from_document(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse stored message document")
    }

    /// Permanent link to the message in the Slack web client.
    ///
    /// Slack's archive URLs use the ts with its decimal point removed.
    pub fn permalink(&self, team_domain: &str) -> String {
        format!(
            "https://{}.slack.com/archives/{}/p{}",
            team_domain,
            self.channel_id,
            self.message.ts.replace('.', "")
        )
    }
}

/// Parse a Slack ts ("1577836800.000200") into seconds.
pub fn parse_ts(ts: &str) -> Result<f64> {
    ts.trim()
        .parse::<f64>()
        .with_context(|| format!("Invalid Slack timestamp: {ts:?}"))
}

/// Result of an insert attempt. Duplicates are expected on re-sync and are
/// not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A message with the same (channel_id, ts) was already stored.
    Duplicate,
}
