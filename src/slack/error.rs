// Typed Slack API failures.
//
// Callers work in anyhow::Result, so the rate-limit signal is recovered by
// downcasting rather than by matching on error text.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlackError {
    /// HTTP 429, or `{"ok": false, "error": "ratelimited"}`.
    #[error("Slack rate limited {method}{}", retry_hint(.retry_after))]
    RateLimited {
        method: String,
        retry_after: Option<u64>,
    },

    /// Any other `{"ok": false}` response.
    #[error("Slack {method} failed: {error}")]
    Api { method: String, error: String },
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    }
}

/// Whether an error (anywhere in its chain) is a Slack rate-limit rejection.
pub fn is_rate_limited(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<SlackError>(),
            Some(SlackError::RateLimited { .. })
        )
    })
}
