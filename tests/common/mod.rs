// Scripted Slack API for driving the sync engine without a network.
//
// Each channel holds a fixed history. `history` answers the way Slack does:
// newest first, `oldest`/`latest` exclusive, at most `limit` messages, and
// `has_more` when older messages inside the window were left out.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::Instant;

use slack_bestof::slack::types::{HistoryPage, HistoryRequest, Reaction, SlackMessage};
use slack_bestof::slack::{SlackApi, SlackError};

/// A failure to inject in place of the next history response.
#[derive(Debug, Clone)]
pub enum Injected {
    RateLimited,
    Api(&'static str),
}

#[derive(Default)]
pub struct FakeSlack {
    domain: String,
    channels: Mutex<HashMap<String, Vec<SlackMessage>>>,
    failures: Mutex<VecDeque<Injected>>,
    requests: Mutex<Vec<(Instant, HistoryRequest)>>,
    team_calls: AtomicUsize,
}

impl FakeSlack {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            ..Default::default()
        }
    }

    /// Replace a channel's history. Order doesn't matter.
    pub fn set_history(&self, channel: &str, messages: Vec<SlackMessage>) {
        self.channels
            .lock()
            .unwrap()
            .insert(channel.to_string(), messages);
    }

    /// Add messages to a channel's history.
    pub fn post(&self, channel: &str, messages: Vec<SlackMessage>) {
        self.channels
            .lock()
            .unwrap()
            .entry(channel.to_string())
            .or_default()
            .extend(messages);
    }

    /// Fail the next Slack calls (history or team.info), in order.
    pub fn fail_next(&self, failures: impl IntoIterator<Item = Injected>) {
        self.failures.lock().unwrap().extend(failures);
    }

    pub fn requests(&self) -> Vec<HistoryRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn request_times(&self) -> Vec<Instant> {
        self.requests.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    pub fn team_calls(&self) -> usize {
        self.team_calls.load(Ordering::SeqCst)
    }

    /// Pop the next injected failure, if any, as the error `method` would return.
    fn take_failure(&self, method: &str) -> Result<()> {
        let Some(failure) = self.failures.lock().unwrap().pop_front() else {
            return Ok(());
        };
        Err(match failure {
            Injected::RateLimited => SlackError::RateLimited {
                method: method.to_string(),
                retry_after: Some(1),
            }
            .into(),
            Injected::Api(error) => SlackError::Api {
                method: method.to_string(),
                error: error.to_string(),
            }
            .into(),
        })
    }
}

#[async_trait]
impl SlackApi for FakeSlack {
    async fn history(&self, request: &HistoryRequest) -> Result<HistoryPage> {
        self.requests
            .lock()
            .unwrap()
            .push((Instant::now(), request.clone()));

        self.take_failure("conversations.history")?;

        let channels = self.channels.lock().unwrap();
        let Some(history) = channels.get(&request.channel) else {
            return Err(SlackError::Api {
                method: "conversations.history".to_string(),
                error: "channel_not_found".to_string(),
            }
            .into());
        };

        let mut window: Vec<SlackMessage> = history
            .iter()
            .filter(|m| m.ts.as_str() > request.oldest.as_str())
            .filter(|m| match &request.latest {
                Some(latest) => m.ts.as_str() < latest.as_str(),
                None => true,
            })
            .cloned()
            .collect();
        window.sort_by(|a, b| b.ts.cmp(&a.ts));

        let limit = request.limit as usize;
        let has_more = window.len() > limit;
        window.truncate(limit);

        Ok(HistoryPage {
            messages: window,
            has_more,
        })
    }

    async fn team_domain(&self) -> Result<String> {
        self.team_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure("team.info")?;
        Ok(self.domain.clone())
    }
}

pub fn msg(ts: &str, user: &str) -> SlackMessage {
    SlackMessage::new(ts, Some(user))
}

pub fn reacted(ts: &str, user: &str, reactions: &[(&str, &[&str])]) -> SlackMessage {
    SlackMessage::new(ts, Some(user)).with_reactions(
        reactions
            .iter()
            .map(|(name, users)| Reaction {
                name: name.to_string(),
                count: users.len() as u64,
                users: users.iter().map(|u| u.to_string()).collect(),
            })
            .collect(),
    )
}

/// Same-width ts values: ts(1) = "1700000001.000000".
pub fn ts(n: u32) -> String {
    format!("{}.000000", 1_700_000_000 + n)
}
