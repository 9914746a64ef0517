// Leaderboard aggregation — one pass over every reacted-to message.
//
// Each message gets two scores:
//   absolute   = number of distinct users who reacted
//   normalized = 100 * reacting users / users who had joined by that message
//
// The normalized score corrects for channel growth: ten reactions meant more
// when the channel had twenty members than when it had two hundred.
// Reaction names are tallied across all messages at the same time.
//
// Top-N selection uses a min-heap capped at N, so memory stays flat no
// matter how much history is stored.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::db::models::StoredMessage;
use crate::db::Database;
use crate::scoring::tenure::TenureMap;

/// A ranked message: its score, its ts (for tie-breaks), and its permalink.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub score: f64,
    pub ts: f64,
    pub link: String,
}

impl LeaderboardEntry {
    /// Ranking order, `Greater` meaning "ranks higher": higher score, then
    /// the older message, then the lexically smaller link.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.ts.total_cmp(&self.ts))
            .then_with(|| other.link.cmp(&self.link))
    }
}

/// Heap adapter so BinaryHeap orders by `rank_cmp`.
#[derive(Debug, Clone)]
struct Ranked(LeaderboardEntry);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank_cmp(&other.0)
    }
}

/// Keeps the N highest-ranked entries seen so far.
#[derive(Debug, Clone)]
pub struct TopN {
    capacity: usize,
    // Min-heap: the root is the weakest entry still on the board
    heap: BinaryHeap<Reverse<Ranked>>,
}

impl TopN {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1)),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn push(&mut self, entry: LeaderboardEntry) {
        if self.capacity == 0 {
            return;
        }
        self.heap.push(Reverse(Ranked(entry)));
        if self.heap.len() > self.capacity {
            self.heap.pop();
        }
    }

    /// The kept entries, best first.
    pub fn into_ranked(self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> =
            self.heap.into_iter().map(|Reverse(Ranked(e))| e).collect();
        entries.sort_by(|a, b| b.rank_cmp(a));
        entries
    }
}

/// Running total of reaction uses by name, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct ReactionTally {
    counts: IndexMap<String, u64>,
}

impl ReactionTally {
    pub fn add(&mut self, name: &str, count: u64) {
        *self.counts.entry(name.to_string()).or_insert(0) += count;
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.counts.get(name).copied()
    }

    /// The top `limit` reactions by count. Equal counts keep first-seen order.
    pub fn ranked(&self, limit: usize) -> Vec<ReactionCount> {
        let mut ranked: Vec<ReactionCount> = self
            .counts
            .iter()
            .map(|(name, &count)| ReactionCount {
                name: name.clone(),
                count,
            })
            .collect();
        // sort_by is stable, which is what keeps ties in first-seen order
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(limit);
        ranked
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionCount {
    pub name: String,
    pub count: u64,
}

/// The three finished leaderboards.
#[derive(Debug, Clone, Default)]
pub struct Leaderboards {
    pub absolute: Vec<LeaderboardEntry>,
    pub normalized: Vec<LeaderboardEntry>,
    pub reactions: Vec<ReactionCount>,
    /// Reacted-to messages seen.
    pub messages_scored: u64,
    /// Messages left off the normalized board because nobody had joined yet.
    pub messages_without_population: u64,
}

/// `100 * reacting / eligible`, or None when nobody was eligible.
pub fn normalized_score(reacting: usize, eligible: usize) -> Option<f64> {
    if eligible == 0 {
        return None;
    }
    Some(100.0 * reacting as f64 / eligible as f64)
}

/// Single-pass scorer. Feed it messages with `observe`, then `finish`.
pub struct Aggregator<'a> {
    tenure: &'a TenureMap,
    team_domain: String,
    size: usize,
    absolute: TopN,
    normalized: TopN,
    reactions: ReactionTally,
    messages_scored: u64,
    messages_without_population: u64,
}

impl<'a> Aggregator<'a> {
    pub fn new(tenure: &'a TenureMap, team_domain: &str, size: usize) -> Self {
        Self {
            tenure,
            team_domain: team_domain.to_string(),
            size,
            absolute: TopN::new(size),
            normalized: TopN::new(size),
            reactions: ReactionTally::default(),
            messages_scored: 0,
            messages_without_population: 0,
        }
    }

    /// Score one message. Messages without reactions are ignored.
    pub fn observe(&mut self, message: &StoredMessage) -> Result<()> {
        if !message.has_reactions() {
            return Ok(());
        }

        let ts = message.ts_value()?;
        let reacting = message.reacting_users().len();
        let link = message.permalink(&self.team_domain);

        self.absolute.push(LeaderboardEntry {
            score: reacting as f64,
            ts,
            link: link.clone(),
        });

        let eligible = self.tenure.active_count_by(ts);
        match normalized_score(reacting, eligible) {
            Some(score) => self.normalized.push(LeaderboardEntry { score, ts, link }),
            None => {
                debug!(link = %link, "No users had joined by this message, skipping normalized score");
                self.messages_without_population += 1;
            }
        }

        for reaction in message.message.reactions.iter().flatten() {
            self.reactions.add(&reaction.name, reaction.count);
        }

        self.messages_scored += 1;
        Ok(())
    }

    pub fn finish(self) -> Leaderboards {
        Leaderboards {
            absolute: self.absolute.into_ranked(),
            normalized: self.normalized.into_ranked(),
            reactions: self.reactions.ranked(self.size),
            messages_scored: self.messages_scored,
            messages_without_population: self.messages_without_population,
        }
    }
}

/// Score every reacted-to message in the given channels.
pub async fn compute_leaderboards(
    db: &dyn Database,
    channel_ids: &[String],
    tenure: &TenureMap,
    team_domain: &str,
    size: usize,
) -> Result<Leaderboards> {
    let messages = db
        .messages_with_reactions(channel_ids)
        .await
        .context("Failed to load reacted-to messages")?;

    let mut aggregator = Aggregator::new(tenure, team_domain, size);
    for message in &messages {
        aggregator
            .observe(message)
            .with_context(|| format!("Failed to score message {}", message.ts()))?;
    }

    let boards = aggregator.finish();
    info!(
        scored = boards.messages_scored,
        without_population = boards.messages_without_population,
        "Computed leaderboards"
    );
    Ok(boards)
}
