// Pipeline orchestration — the multi-step flows that tie Slack, the store,
// and scoring together.

pub mod sync;
