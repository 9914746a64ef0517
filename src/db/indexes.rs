// Index management for the messages table.
//
// The unique (channel_id, ts) index is what makes sync idempotent: without
// it a re-run would store every message twice. It must exist before the
// first insert, so `ensure_indexes` runs at startup on every backend.

use anyhow::{Context, Result};
use tracing::info;

use super::traits::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// A named index over columns of the messages table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub columns: &'static [(&'static str, SortOrder)],
    pub unique: bool,
}

impl IndexSpec {
    /// Column list for CREATE INDEX, e.g. "channel_id ASC, ts DESC".
    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|(column, order)| format!("{column} {}", order.as_sql()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Full CREATE INDEX statement for the messages table.
    pub fn create_sql(&self) -> String {
        format!(
            "CREATE {}INDEX {} ON messages ({})",
            if self.unique { "UNIQUE " } else { "" },
            self.name,
            self.column_list()
        )
    }
}

/// Uniqueness over (channel_id, ts), newest first within a channel.
pub const CHANNEL_TS_INDEX: IndexSpec = IndexSpec {
    name: "idx_messages_channel_ts",
    columns: &[
        ("channel_id", SortOrder::Ascending),
        ("ts", SortOrder::Descending),
    ],
    unique: true,
};

/// Plain ts ordering for tenure lookups and scans.
pub const TS_INDEX: IndexSpec = IndexSpec {
    name: "idx_messages_ts",
    columns: &[("ts", SortOrder::Ascending)],
    unique: false,
};

pub const MESSAGE_INDEXES: [IndexSpec; 2] = [CHANNEL_TS_INDEX, TS_INDEX];

/// Create any missing message indexes.
///
/// Safe to call on every start. Existing indexes are matched by name and
/// left alone. A failed CREATE (for example, duplicate rows blocking the
/// unique index) is returned as an error. Returns the names that were created.
pub async fn ensure_indexes(db: &dyn Database) -> Result<Vec<&'static str>> {
    let existing = db
        .index_names()
        .await
        .context("Failed to list message indexes")?;

    let mut created = Vec::new();
    for index in &MESSAGE_INDEXES {
        if existing.iter().any(|name| name == index.name) {
            continue;
        }
        info!(index = index.name, "Creating index");
        db.create_index(index)
            .await
            .with_context(|| format!("Failed to create index {}", index.name))?;
        created.push(index.name);
    }

    Ok(created)
}
