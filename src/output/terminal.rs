// Terminal output for the leaderboards and the sync summary.
//
// The leaderboard lines themselves are plain text so they can be piped or
// pasted into Slack. Only the titles and the summary get color.

use colored::Colorize;

use crate::pipeline::sync::ChannelSyncStats;
use crate::scoring::leaderboard::{LeaderboardEntry, Leaderboards, ReactionCount};

pub const ABSOLUTE_TITLE: &str = "Most-Reacted Messages Leaderboard:";
pub const NORMALIZED_TITLE: &str = "(Normalized) Most-Reacted Messages Leaderboard:";
pub const REACTIONS_TITLE: &str = "Most-Used Reactions Leaderboard:";

/// `01. (3.00 reacts): https://...`
pub fn absolute_lines(entries: &[LeaderboardEntry]) -> Vec<String> {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{:02}. ({:.2} reacts): {}", i + 1, e.score, e.link))
        .collect()
}

/// `01. (50.00% reacted): https://...`
pub fn normalized_lines(entries: &[LeaderboardEntry]) -> Vec<String> {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{:02}. ({:.2}% reacted): {}", i + 1, e.score, e.link))
        .collect()
}

/// `01. (4 times): :+1:`
pub fn reaction_lines(reactions: &[ReactionCount]) -> Vec<String> {
    reactions
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{:02}. ({} times): :{}:", i + 1, r.count, r.name))
        .collect()
}

/// Shown under the boards when nothing has been scored yet.
pub const EMPTY_HINT: &str =
    "No reacted-to messages stored yet. Run without --skip-slack-sync first.";

/// The whole report as plain text, boards in fixed order.
pub fn render_report(boards: &Leaderboards) -> String {
    format_report(boards, |title| title.to_string())
}

/// Print the report to stdout with bold titles.
pub fn display_report(boards: &Leaderboards) {
    print!("{}", format_report(boards, |title| title.bold().to_string()));
}

/// Build the report, passing each board title through `style`.
fn format_report(boards: &Leaderboards, style: impl Fn(&str) -> String) -> String {
    let sections = [
        (ABSOLUTE_TITLE, absolute_lines(&boards.absolute)),
        (NORMALIZED_TITLE, normalized_lines(&boards.normalized)),
        (REACTIONS_TITLE, reaction_lines(&boards.reactions)),
    ];

    let mut out = String::new();
    for (title, lines) in sections {
        out.push_str(&style(title));
        out.push('\n');
        for line in &lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }

    if boards.messages_scored == 0 {
        out.push_str(EMPTY_HINT);
        out.push('\n');
    }
    out
}

/// Print a per-channel table of what the sync did.
pub fn display_sync_summary(stats: &[ChannelSyncStats]) {
    if stats.is_empty() {
        return;
    }

    println!("\n{}", "=== Sync Summary ===".bold());
    println!(
        "  {:<24} {:>6} {:>9} {:>9} {:>6} {:>9}",
        "Channel".dimmed(),
        "Pages".dimmed(),
        "Fetched".dimmed(),
        "Inserted".dimmed(),
        "Dupes".dimmed(),
        "Throttled".dimmed(),
    );
    println!("  {}", "-".repeat(68).dimmed());

    for s in stats {
        let inserted = if s.inserted > 0 {
            s.inserted.to_string().green()
        } else {
            s.inserted.to_string().normal()
        };
        let rejections = if s.rejections > 0 {
            s.rejections.to_string().yellow()
        } else {
            s.rejections.to_string().normal()
        };
        println!(
            "  #{:<23} {:>6} {:>9} {:>9} {:>6} {:>9}",
            s.channel_name, s.pages, s.fetched, inserted, s.duplicates, rejections,
        );
    }

    let total: u64 = stats.iter().map(|s| s.inserted).sum();
    println!("\n  {total} new messages stored\n");
}
