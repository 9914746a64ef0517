use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;

/// Default SQLite database path when no DATABASE_URL is given.
pub const DEFAULT_DB_PATH: &str = "./slack-bestof.db";

/// Default number of entries per leaderboard.
pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;

/// Default `limit` for history pages (Slack caps this at 1000).
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// A channel to sync, from the channels file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

/// Where the message store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Sqlite(String),
    Postgres(String),
}

impl DatabaseTarget {
    /// Classify a database URL. Anything that isn't a postgres:// URL is
    /// treated as a SQLite path (an optional `sqlite://` prefix is stripped).
    pub fn parse(url: &str) -> Self {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            DatabaseTarget::Postgres(url.to_string())
        } else {
            let path = url.strip_prefix("sqlite://").unwrap_or(url);
            DatabaseTarget::Sqlite(path.to_string())
        }
    }
}

/// Central configuration, resolved from CLI flags and environment variables.
///
/// All secrets come from flags or env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    pub slack_api_token: String,
    /// Slack Web API endpoint (defaults to https://slack.com/api).
    pub slack_api_url: String,
    /// SQLite path or PostgreSQL URL.
    pub database_url: String,
    pub channels_file: PathBuf,
    pub skip_sync: bool,
    pub leaderboard_size: usize,
    pub page_size: u32,
}

impl Config {
    /// Check the settings that can be checked without touching the network.
    pub fn validate(&self) -> Result<()> {
        if self.slack_api_token.trim().is_empty() {
            anyhow::bail!(
                "SLACK_API_TOKEN not set. Pass --slack-api-token or add it to your .env file."
            );
        }
        if !(1..=1000).contains(&self.page_size) {
            anyhow::bail!(
                "--page-size must be between 1 and 1000 (got {})",
                self.page_size
            );
        }
        Ok(())
    }

    pub fn database_target(&self) -> DatabaseTarget {
        DatabaseTarget::parse(&self.database_url)
    }

    /// Load the channels file named by this config.
    pub fn channels(&self) -> Result<Vec<Channel>> {
        load_channels(&self.channels_file)
    }
}

/// Load the channels file: a flat JSON object of channel id to channel name.
///
/// Order is preserved — channels sync in the order they're listed.
pub fn load_channels(path: &Path) -> Result<Vec<Channel>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read channels file {}", path.display()))?;
    parse_channels(&json).with_context(|| format!("Invalid channels file {}", path.display()))
}

/// Parse channel config JSON, e.g. `{"C024BE91L": "general"}`.
pub fn parse_channels(json: &str) -> Result<Vec<Channel>> {
    let map: IndexMap<String, String> =
        serde_json::from_str(json).context("Expected a JSON object of channel id -> name")?;

    if map.is_empty() {
        anyhow::bail!("No channels configured");
    }

    let channels = map
        .into_iter()
        .map(|(id, name)| {
            let id = id.trim().to_string();
            if id.is_empty() {
                anyhow::bail!("Channel id must not be empty (name {name:?})");
            }
            Ok(Channel { id, name })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(channels)
}

/// Channel ids in config order.
pub fn channel_ids(channels: &[Channel]) -> Vec<String> {
    channels.iter().map(|c| c.id.clone()).collect()
}
