// Scoring — tenure lookups and leaderboard aggregation.

pub mod leaderboard;
pub mod tenure;
