// Database trait — backend-agnostic async interface for the message store.
//
// Implementors: SqliteDatabase (wraps rusqlite), PgDatabase (wraps sqlx).
// All methods are async so both sync (rusqlite via Mutex) and native async
// (sqlx) backends fit behind a single interface.
//
// The surface is deliberately narrow: index introspection/creation, a
// sorted-and-limited lookup, distinct users, duplicate-aware insert, and the
// reaction scan the leaderboard runs over.

use anyhow::Result;
use async_trait::async_trait;

use super::indexes::IndexSpec;
use super::models::{InsertOutcome, StoredMessage};

#[async_trait]
pub trait Database: Send + Sync {
    // --- Indexes ---

    /// Names of the indexes currently defined on the messages table.
    async fn index_names(&self) -> Result<Vec<String>>;

    /// Create an index. Fails if it conflicts with existing data.
    async fn create_index(&self, index: &IndexSpec) -> Result<()>;

    // --- Sync ---

    /// The newest stored ts for a channel (ts descending, limit 1).
    async fn latest_message_ts(&self, channel_id: &str) -> Result<Option<String>>;

    /// Store a message. A (channel_id, ts) collision is reported as
    /// `InsertOutcome::Duplicate`, never as an error.
    async fn insert_message(&self, message: &StoredMessage) -> Result<InsertOutcome>;

    /// Total number of stored messages.
    async fn message_count(&self) -> Result<i64>;

    // --- Leaderboard ---

    /// Every distinct author across all stored messages (any channel).
    async fn distinct_users(&self) -> Result<Vec<String>>;

    /// The earliest ts a user posted within the given channels (ts ascending, limit 1).
    async fn first_message_ts(&self, user: &str, channel_ids: &[String])
        -> Result<Option<String>>;

    /// All messages in the given channels with a non-empty reactions list,
    /// oldest first.
    async fn messages_with_reactions(&self, channel_ids: &[String]) -> Result<Vec<StoredMessage>>;
}
