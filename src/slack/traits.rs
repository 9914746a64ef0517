// SlackApi trait — the two Slack calls the pipeline needs.
//
// SlackClient is the real implementation; tests drive the sync engine with
// scripted fakes.

use anyhow::Result;
use async_trait::async_trait;

use super::types::{HistoryPage, HistoryRequest};

#[async_trait]
pub trait SlackApi: Send + Sync {
    /// Fetch one page of channel history.
    ///
    /// A rate-limit rejection must surface as `SlackError::RateLimited`
    /// (see `slack::error::is_rate_limited`) so the caller can back off.
    async fn history(&self, request: &HistoryRequest) -> Result<HistoryPage>;

    /// The workspace subdomain used to build message permalinks.
    async fn team_domain(&self) -> Result<String>;
}
