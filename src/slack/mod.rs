// Slack Web API — history paging, team lookup, and rate-limit handling.

pub mod client;
pub mod error;
pub mod throttle;
pub mod traits;
pub mod types;

pub use error::{is_rate_limited, SlackError};
pub use traits::SlackApi;
