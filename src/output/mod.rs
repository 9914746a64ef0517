// Output formatting — leaderboard report and sync summary.

pub mod terminal;
