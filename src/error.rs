use thiserror::Error;
use uuid::Uuid;

/// Failures of the quick-stats pipeline. Both variants abort the whole
/// invocation; there is no partial result.
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("ticket store query failed: {0}")]
    Store(#[from] sqlx::Error),

    #[error("ticket {uid}: dangling {path} reference to user {user_id}")]
    MissingRelation {
        uid: i64,
        path: &'static str,
        user_id: Uuid,
    },
}
