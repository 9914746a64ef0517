// Tenure: when each user first showed up in the tracked channels.
//
// A user's earliest message in scope is the proxy for when they joined, and
// so for whether they could have reacted to a given message at all. The set
// of users already present at a message's ts is the denominator for the
// normalized popularity score.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::db::models::parse_ts;
use crate::db::Database;

/// User id -> ts (seconds) of that user's first in-scope message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenureMap {
    starts: HashMap<String, f64>,
}

impl TenureMap {
    pub fn new(starts: HashMap<String, f64>) -> Self {
        Self { starts }
    }

    pub fn get(&self, user: &str) -> Option<f64> {
        self.starts.get(user).copied()
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Users who had posted at or before `timestamp`.
    ///
    /// Inclusive: a user whose first message *is* this message counts.
    pub fn users_active_by(&self, timestamp: f64) -> HashSet<&str> {
        self.starts
            .iter()
            .filter(|&(_, &start)| start <= timestamp)
            .map(|(user, _)| user.as_str())
            .collect()
    }

    /// Size of `users_active_by(timestamp)` without building the set.
    pub fn active_count_by(&self, timestamp: f64) -> usize {
        self.starts
            .values()
            .filter(|&&start| start <= timestamp)
            .count()
    }
}

impl FromIterator<(String, f64)> for TenureMap {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Build the tenure map for the given channels.
///
/// Authors are gathered across the whole store, then each one's first
/// message is looked up within `channel_ids`. Authors who never posted in
/// those channels are left out rather than given a placeholder.
pub async fn build_tenure_map(db: &dyn Database, channel_ids: &[String]) -> Result<TenureMap> {
    let users = db
        .distinct_users()
        .await
        .context("Failed to list message authors")?;

    let mut starts = HashMap::with_capacity(users.len());
    for user in users {
        let first = db
            .first_message_ts(&user, channel_ids)
            .await
            .with_context(|| format!("Failed to find first message for {user}"))?;

        match first {
            Some(ts) => {
                let start = parse_ts(&ts)?;
                starts.insert(user, start);
            }
            None => debug!(user = %user, "No messages in tracked channels, skipping"),
        }
    }

    info!(users = starts.len(), "Built tenure map");
    Ok(TenureMap::new(starts))
}
