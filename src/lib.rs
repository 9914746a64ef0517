// slack-bestof: "best of" leaderboards for Slack channels
//
// This is the library root. Each module corresponds to one stage of the
// flow: sync history into the store, derive tenure, score, print.

pub mod config;
pub mod db;
pub mod output;
pub mod pipeline;
pub mod scoring;
pub mod slack;
