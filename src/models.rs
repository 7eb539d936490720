use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A user record with relations already resolved to concrete values.
///
/// Ranking buckets key on `fullname`, not on the storage id: two distinct
/// users sharing a display name collapse into one leaderboard entry. That
/// aliasing is inherited behavior and kept on purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub fullname: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub owner: User,
    pub body: String,
}

/// One opaque change-log entry on a ticket. The statistics only ever look
/// at how many of these a ticket has.
#[derive(Debug, Clone)]
pub struct HistoryEvent {
    pub action: String,
    pub occurred_at: DateTime<Utc>,
}

/// A fully resolved ticket: owner, assignee and comment owners expanded to
/// user records. `uid` is the human-facing sequential number, distinct from
/// the storage key.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub uid: i64,
    pub subject: String,
    pub owner: User,
    pub assignee: Option<User>,
    pub comments: Vec<Comment>,
    pub history: Vec<HistoryEvent>,
}

/// An unresolved ticket as it comes out of the store: user relations are
/// still bare ids.
#[derive(Debug, Clone)]
pub struct TicketRow {
    pub uid: i64,
    pub subject: String,
    pub owner_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub comments: Vec<CommentRow>,
    pub history: Vec<HistoryEvent>,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub owner_id: Uuid,
    pub body: String,
}

/// One row of a leaderboard: a display name and how many times it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub value: u64,
}

/// One row of the activity board: a ticket and the size of its change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub uid: i64,
    pub history_len: usize,
}

/// The dashboard headline numbers. Every field is the top entry of its
/// leaderboard, or `None` when that board came out empty (no tickets, or no
/// assigned tickets). Renderers show "--" for absent fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_requester: Option<LeaderboardEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_commenter: Option<LeaderboardEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_assignee: Option<LeaderboardEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_active_ticket: Option<ActivityEntry>,
}
