// Database queries — message reads and writes for the SQLite backend.
//
// Every SQLite interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use anyhow::Result;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};

use super::models::{InsertOutcome, StoredMessage};

/// "?2, ?3, ..." for an IN (...) list whose parameters start at `first`.
fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// --- Sync ---

/// The newest ts stored for a channel.
pub fn latest_message_ts(conn: &Connection, channel_id: &str) -> Result<Option<String>> {
    let mut stmt =
        conn.prepare("SELECT ts FROM messages WHERE channel_id = ?1 ORDER BY ts DESC LIMIT 1")?;
    let result = stmt
        .query_row(params![channel_id], |row| row.get(0))
        .optional()?;
    Ok(result)
}

/// Insert a message, reporting a unique-index collision as a duplicate.
pub fn insert_message(conn: &Connection, message: &StoredMessage) -> Result<InsertOutcome> {
    let reactions = message.reactions_json()?;
    let document = message.document_json()?;

    let result = conn.execute(
        "INSERT INTO messages (channel_id, channel_name, ts, user_id, reactions, document)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            message.channel_id,
            message.channel_name,
            message.ts(),
            message.user(),
            reactions,
            document,
        ],
    );

    match result {
        Ok(_) => Ok(InsertOutcome::Inserted),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation
                && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Ok(InsertOutcome::Duplicate)
        }
        Err(e) => Err(e.into()),
    }
}

/// Total stored messages.
pub fn message_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
    Ok(count)
}

// --- Leaderboard ---

/// Every distinct author, across all channels.
pub fn distinct_users(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT user_id FROM messages WHERE user_id IS NOT NULL ORDER BY user_id",
    )?;
    let users = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(users)
}

/// The earliest ts a user posted within the given channels.
pub fn first_message_ts(
    conn: &Connection,
    user: &str,
    channel_ids: &[String],
) -> Result<Option<String>> {
    if channel_ids.is_empty() {
        return Ok(None);
    }

    let sql = format!(
        "SELECT ts FROM messages WHERE user_id = ?1 AND channel_id IN ({})
         ORDER BY ts ASC LIMIT 1",
        placeholders(2, channel_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let args = std::iter::once(user).chain(channel_ids.iter().map(String::as_str));
    let result = stmt
        .query_row(params_from_iter(args), |row| row.get(0))
        .optional()?;
    Ok(result)
}

/// Messages in the given channels that carry at least one reaction.
pub fn messages_with_reactions(
    conn: &Connection,
    channel_ids: &[String],
) -> Result<Vec<StoredMessage>> {
    if channel_ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT document FROM messages
         WHERE channel_id IN ({}) AND reactions IS NOT NULL AND reactions <> '[]'
         ORDER BY ts ASC, channel_id ASC",
        placeholders(1, channel_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let documents = stmt
        .query_map(params_from_iter(channel_ids.iter()), |row| {
            row.get::<_, String>(0)
        })?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    documents
        .iter()
        .map(|doc| StoredMessage::from_document(doc))
        .collect()
}
