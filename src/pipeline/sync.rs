// Channel history sync: resume from the newest stored message, page
// backwards through Slack history, and store every message exactly once.
//
// Per channel the engine moves through Resuming (look up the newest stored
// ts) -> Fetching (one history page) -> Draining (repeat while Slack says
// has_more) -> Done. A rate-limit rejection turns the shared Throttle on and
// the same page is requested again; there is no retry cap, because the
// budget always comes back.
//
// Channels run one after another. The rate budget belongs to the token, so
// syncing channels in parallel would only trade one rejection for several.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Channel;
use crate::db::models::{InsertOutcome, StoredMessage};
use crate::db::Database;
use crate::slack::throttle::Throttle;
use crate::slack::types::{HistoryPage, HistoryRequest};
use crate::slack::{is_rate_limited, SlackApi};

/// Resume point for a channel with nothing stored yet.
pub const BEGINNING_OF_TIME: &str = "0";

/// What one channel's sync did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSyncStats {
    pub channel_id: String,
    pub channel_name: String,
    /// The newest ts already stored before this run (None if the channel was empty).
    pub resumed_from: Option<String>,
    pub pages: u32,
    pub fetched: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub rejections: u64,
}

pub struct SyncEngine<'a> {
    api: &'a dyn SlackApi,
    db: &'a dyn Database,
    throttle: Throttle,
    page_size: u32,
}

impl<'a> SyncEngine<'a> {
    pub fn new(api: &'a dyn SlackApi, db: &'a dyn Database, page_size: u32) -> Self {
        Self {
            api,
            db,
            throttle: Throttle::default(),
            page_size,
        }
    }

    /// Replace the default throttle (1.2s delay, 5 minute cooldown).
    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// Sync every channel, in order. Stops at the first fatal error.
    pub async fn run(&mut self, channels: &[Channel]) -> Result<Vec<ChannelSyncStats>> {
        let mut all_stats = Vec::with_capacity(channels.len());
        for channel in channels {
            all_stats.push(self.sync_channel(channel).await?);
        }

        let inserted: u64 = all_stats.iter().map(|s| s.inserted).sum();
        info!(
            channels = channels.len(),
            inserted,
            rejections = self.throttle.rejections(),
            "Done syncing"
        );
        Ok(all_stats)
    }

    /// Sync one channel from its newest stored message to the present.
    pub async fn sync_channel(&mut self, channel: &Channel) -> Result<ChannelSyncStats> {
        let resumed_from = self
            .db
            .latest_message_ts(&channel.id)
            .await
            .with_context(|| format!("Failed to find resume point for #{}", channel.name))?;

        let oldest = resumed_from
            .clone()
            .unwrap_or_else(|| BEGINNING_OF_TIME.to_string());

        info!(
            channel = %channel.name,
            from = %describe_ts(&oldest),
            "Syncing channel"
        );

        let mut stats = ChannelSyncStats {
            channel_id: channel.id.clone(),
            channel_name: channel.name.clone(),
            resumed_from,
            ..Default::default()
        };

        let mut request = HistoryRequest {
            channel: channel.id.clone(),
            oldest,
            latest: None,
            limit: self.page_size,
        };

        let spinner = sync_spinner(&channel.name);

        loop {
            let page = self.fetch_page(&request, channel, &mut stats).await?;
            stats.pages += 1;

            // Slack returns newest first; the last message bounds the next page
            let boundary = page.messages.last().map(|m| m.ts.clone());
            let has_more = page.has_more;

            self.store_page(page, channel, &mut stats).await?;

            debug!(
                channel = %channel.name,
                page = stats.pages,
                fetched = stats.fetched,
                has_more,
                "Stored history page"
            );
            spinner.set_message(format!(
                "{}: {} messages ({} new)",
                channel.name, stats.fetched, stats.inserted
            ));

            if !has_more {
                break;
            }

            match boundary {
                Some(ts) => request.latest = Some(ts),
                None => {
                    warn!(
                        channel = %channel.name,
                        "Slack reported more history but sent an empty page, stopping"
                    );
                    break;
                }
            }
        }

        spinner.finish_and_clear();

        info!(
            channel = %channel.name,
            pages = stats.pages,
            fetched = stats.fetched,
            inserted = stats.inserted,
            duplicates = stats.duplicates,
            "Channel synced"
        );

        Ok(stats)
    }

    /// Look up the workspace domain for permalinks, paced by the same
    /// throttle as the history calls.
    pub async fn team_domain(&mut self) -> Result<String> {
        let api = self.api;
        self.throttled("team.info", || api.team_domain())
            .await
            .context("Failed to look up the workspace domain")
    }

    /// Request one page, waiting out rate limits for as long as it takes.
    async fn fetch_page(
        &mut self,
        request: &HistoryRequest,
        channel: &Channel,
        stats: &mut ChannelSyncStats,
    ) -> Result<HistoryPage> {
        let api = self.api;
        let rejections_before = self.throttle.rejections();

        let result = self
            .throttled(&channel.name, || api.history(request))
            .await;

        stats.rejections += self.throttle.rejections() - rejections_before;
        result.with_context(|| format!("Failed to fetch history for #{}", channel.name))
    }

    /// Run one Slack call under the throttle. Rate-limit rejections are
    /// retried without limit; any other error is returned as is.
    async fn throttled<T, F, Fut>(&mut self, what: &str, call: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        loop {
            self.throttle.wait().await;

            match call().await {
                Ok(value) => {
                    self.throttle.record_success();
                    return Ok(value);
                }
                Err(e) if is_rate_limited(&e) => {
                    debug!(call = %what, error = %e, "Slack request rejected");
                    self.throttle.record_rejection();
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Annotate and insert every message in a page.
    async fn store_page(
        &self,
        page: HistoryPage,
        channel: &Channel,
        stats: &mut ChannelSyncStats,
    ) -> Result<()> {
        for message in page.messages {
            stats.fetched += 1;
            let stored = StoredMessage::new(&channel.id, &channel.name, message);

            let outcome = self.db.insert_message(&stored).await.with_context(|| {
                format!(
                    "Failed to store message {} from #{}",
                    stored.ts(),
                    channel.name
                )
            })?;

            match outcome {
                InsertOutcome::Inserted => stats.inserted += 1,
                // (channel_id, ts) is unique in Slack, so this is a message we already have
                InsertOutcome::Duplicate => stats.duplicates += 1,
            }
        }
        Ok(())
    }
}

/// Human-readable form of a Slack ts for log lines.
pub fn describe_ts(ts: &str) -> String {
    if ts == BEGINNING_OF_TIME {
        return "the beginning".to_string();
    }
    let seconds = ts
        .split('.')
        .next()
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0));
    match seconds {
        Some(when) => format!("{ts} ({})", when.format("%Y-%m-%d %H:%M:%S UTC")),
        None => ts.to_string(),
    }
}

fn sync_spinner(channel_name: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} #{msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("{channel_name}: starting"));
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
