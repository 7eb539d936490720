use std::collections::BTreeMap;

use sqlx::PgPool;
use tracing::debug;

use crate::db;
use crate::error::StatsError;
use crate::models::{ActivityEntry, DashboardStats, LeaderboardEntry, Ticket, TicketRow};

/// Computes the dashboard headline stats from a snapshot of the corpus.
///
/// When `tickets` is given, relations are resolved on exactly that set;
/// otherwise the full corpus is fetched first. A store or resolution failure
/// aborts the whole invocation, there is no partial result.
pub async fn quick_stats(
    pool: &PgPool,
    tickets: Option<Vec<TicketRow>>,
) -> Result<DashboardStats, StatsError> {
    let rows = match tickets {
        Some(rows) => rows,
        None => db::fetch_for_cache(pool).await?,
    };
    let resolved = db::populate(pool, rows).await?;
    debug!("ranking {} resolved tickets", resolved.len());
    Ok(summarize(&resolved))
}

/// The synchronous part of the aggregation: the head of each of the four
/// leaderboards, `None` where a board came out empty.
pub fn summarize(tickets: &[Ticket]) -> DashboardStats {
    DashboardStats {
        most_requester: rank_requesters(tickets).into_iter().next(),
        most_commenter: rank_commenters(tickets).into_iter().next(),
        most_assignee: rank_assignees(tickets).into_iter().next(),
        most_active_ticket: rank_activity(tickets).into_iter().next(),
    }
}

/// One count per ticket, keyed on the owner's display name.
pub fn rank_requesters(tickets: &[Ticket]) -> Vec<LeaderboardEntry> {
    rank_names(tickets.iter().map(|t| t.owner.fullname.as_str()))
}

/// One count per comment across the whole corpus; several comments by the
/// same person on one ticket all count.
pub fn rank_commenters(tickets: &[Ticket]) -> Vec<LeaderboardEntry> {
    rank_names(
        tickets
            .iter()
            .flat_map(|t| t.comments.iter().map(|c| c.owner.fullname.as_str())),
    )
}

/// One count per assigned ticket. Unassigned tickets are dropped before
/// counting so they never show up as a pseudo-category.
pub fn rank_assignees(tickets: &[Ticket]) -> Vec<LeaderboardEntry> {
    rank_names(
        tickets
            .iter()
            .filter_map(|t| t.assignee.as_ref().map(|a| a.fullname.as_str())),
    )
}

/// Every ticket emits exactly one entry (even with an empty change log),
/// ordered by change-log size descending. The sort is stable, so equal
/// sizes keep corpus order.
pub fn rank_activity(tickets: &[Ticket]) -> Vec<ActivityEntry> {
    let mut entries: Vec<ActivityEntry> = tickets
        .iter()
        .map(|t| ActivityEntry {
            uid: t.uid,
            history_len: t.history.len(),
        })
        .collect();
    entries.sort_by(|a, b| b.history_len.cmp(&a.history_len));
    entries
}

/// Shared frequency ranking over name keys: distinct names start at zero in
/// ascending-name order, one pass over the keys increments, then a stable
/// sort by count descending. Equal counts therefore stay in ascending-name
/// order.
fn rank_names<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<LeaderboardEntry> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut entries: Vec<LeaderboardEntry> = counts
        .into_iter()
        .map(|(name, value)| LeaderboardEntry {
            name: name.to_string(),
            value,
        })
        .collect();
    entries.sort_by(|a, b| b.value.cmp(&a.value));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comment, HistoryEvent, User};
    use chrono::Utc;

    fn user(name: &str) -> User {
        User {
            fullname: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        }
    }

    fn ticket(uid: i64, owner: &str, assignee: Option<&str>) -> Ticket {
        Ticket {
            uid,
            subject: format!("Ticket #{uid}"),
            owner: user(owner),
            assignee: assignee.map(user),
            comments: Vec::new(),
            history: Vec::new(),
        }
    }

    fn with_comments(mut ticket: Ticket, commenters: &[&str]) -> Ticket {
        ticket.comments = commenters
            .iter()
            .map(|name| Comment {
                owner: user(name),
                body: "looking into it".to_string(),
            })
            .collect();
        ticket
    }

    fn with_history(mut ticket: Ticket, events: usize) -> Ticket {
        ticket.history = (0..events)
            .map(|i| HistoryEvent {
                action: format!("update:{i}"),
                occurred_at: Utc::now(),
            })
            .collect();
        ticket
    }

    #[test]
    fn empty_corpus_yields_no_stats() {
        let stats = summarize(&[]);
        assert_eq!(stats.most_requester, None);
        assert_eq!(stats.most_commenter, None);
        assert_eq!(stats.most_assignee, None);
        assert_eq!(stats.most_active_ticket, None);
    }

    #[test]
    fn every_ticket_counts_once_for_its_owner() {
        let tickets = vec![
            with_history(with_comments(ticket(1000, "Alice", None), &["Bob", "Bob"]), 7),
            ticket(1001, "Alice", None),
            ticket(1002, "Alice", None),
        ];

        let stats = summarize(&tickets);
        assert_eq!(
            stats.most_requester,
            Some(LeaderboardEntry {
                name: "Alice".to_string(),
                value: 3,
            })
        );
    }

    #[test]
    fn equal_counts_order_by_ascending_name() {
        let tickets = vec![
            ticket(1000, "Bob", None),
            ticket(1001, "Bob", None),
            ticket(1002, "Alice", None),
            ticket(1003, "Alice", None),
        ];

        let board = rank_requesters(&tickets);
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].name, "Alice");
        assert_eq!(board[0].value, 2);
        assert_eq!(board[1].name, "Bob");
        assert_eq!(board[1].value, 2);
    }

    #[test]
    fn higher_counts_outrank_earlier_names() {
        let tickets = vec![
            ticket(1000, "Alice", None),
            ticket(1001, "Zoe", None),
            ticket(1002, "Zoe", None),
        ];

        let board = rank_requesters(&tickets);
        assert_eq!(board[0].name, "Zoe");
        assert_eq!(board[0].value, 2);
        assert_eq!(board[1].name, "Alice");
    }

    #[test]
    fn unassigned_tickets_never_reach_the_assignee_board() {
        let tickets = vec![
            ticket(1000, "Alice", Some("Bob")),
            ticket(1001, "Alice", None),
            ticket(1002, "Alice", None),
        ];

        let board = rank_assignees(&tickets);
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].name, "Bob");
        assert_eq!(board[0].value, 1);
        assert_eq!(board.iter().map(|e| e.value).sum::<u64>(), 1);
    }

    #[test]
    fn every_comment_counts_even_with_repeat_authors() {
        let tickets = vec![with_comments(
            ticket(1000, "Alice", None),
            &["Carol", "Carol", "Carol", "Dave"],
        )];

        let board = rank_commenters(&tickets);
        assert_eq!(board[0].name, "Carol");
        assert_eq!(board[0].value, 3);
        assert_eq!(board[1].name, "Dave");
        assert_eq!(board[1].value, 1);
    }

    #[test]
    fn busiest_change_log_wins_the_activity_board() {
        let tickets = vec![
            with_history(ticket(1000, "Alice", None), 5),
            with_history(ticket(1001, "Alice", None), 1),
            with_history(ticket(1002, "Alice", None), 5),
            with_history(ticket(1003, "Alice", None), 3),
        ];

        let stats = summarize(&tickets);
        let top = stats.most_active_ticket.unwrap();
        assert_eq!(top.history_len, 5);

        let board = rank_activity(&tickets);
        assert_eq!(board.len(), 4);
        assert_eq!(board[3].uid, 1001);
    }

    #[test]
    fn quiet_tickets_still_appear_on_the_activity_board() {
        let tickets = vec![ticket(1000, "Alice", None)];
        let board = rank_activity(&tickets);
        assert_eq!(
            board,
            vec![ActivityEntry {
                uid: 1000,
                history_len: 0,
            }]
        );
    }

    #[test]
    fn summarizing_twice_gives_identical_stats() {
        let tickets = vec![
            with_history(
                with_comments(ticket(1000, "Alice", Some("Bob")), &["Carol", "Dave"]),
                4,
            ),
            ticket(1001, "Bob", None),
        ];

        assert_eq!(summarize(&tickets), summarize(&tickets));
    }
}
