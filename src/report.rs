use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{ActivityEntry, LeaderboardEntry, Ticket};
use crate::stats;

pub fn leaderboard_cell(entry: Option<&LeaderboardEntry>) -> String {
    match entry {
        Some(entry) => format!("{} ({})", entry.name, entry.value),
        None => "--".to_string(),
    }
}

pub fn activity_cell(entry: Option<&ActivityEntry>) -> String {
    match entry {
        Some(entry) => format!("#{} ({} events)", entry.uid, entry.history_len),
        None => "--".to_string(),
    }
}

pub fn build_report(tickets: &[Ticket], generated: NaiveDate) -> String {
    let headline = stats::summarize(tickets);

    let mut output = String::new();
    let _ = writeln!(output, "# Helpdesk Dashboard");
    let _ = writeln!(
        output,
        "Generated on {} from {} tickets",
        generated,
        tickets.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Quick Stats");
    let _ = writeln!(
        output,
        "- Most requester: {}",
        leaderboard_cell(headline.most_requester.as_ref())
    );
    let _ = writeln!(
        output,
        "- Most commenter: {}",
        leaderboard_cell(headline.most_commenter.as_ref())
    );
    let _ = writeln!(
        output,
        "- Most assignee: {}",
        leaderboard_cell(headline.most_assignee.as_ref())
    );
    let _ = writeln!(
        output,
        "- Most active ticket: {}",
        activity_cell(headline.most_active_ticket.as_ref())
    );

    write_leaderboard(&mut output, "Top Requesters", &stats::rank_requesters(tickets));
    write_leaderboard(&mut output, "Top Commenters", &stats::rank_commenters(tickets));
    write_leaderboard(&mut output, "Top Assignees", &stats::rank_assignees(tickets));

    let activity = stats::rank_activity(tickets);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Most Active Tickets");
    if activity.is_empty() {
        let _ = writeln!(output, "No tickets in the corpus.");
    } else {
        for entry in activity.iter().take(10) {
            let _ = writeln!(output, "- #{}: {} events", entry.uid, entry.history_len);
        }
    }

    output
}

fn write_leaderboard(output: &mut String, title: &str, board: &[LeaderboardEntry]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");

    if board.is_empty() {
        let _ = writeln!(output, "No entries for this board.");
    } else {
        for entry in board.iter().take(10) {
            let _ = writeln!(output, "- {}: {}", entry.name, entry.value);
        }
    }
}
