use std::collections::HashMap;

use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::error::StatsError;
use crate::models::{Comment, CommentRow, HistoryEvent, Ticket, TicketRow, User};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let users = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Maya Chen",
            "maya.chen@helpdesk.example",
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Omar Haddad",
            "omar.haddad@helpdesk.example",
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Priya Nair",
            "priya.nair@helpdesk.example",
        ),
        (
            Uuid::parse_str("7b1f2c6e-5a4d-4f0b-9c3a-1d2e3f4a5b6c")?,
            "Tom Velasquez",
            "tom.velasquez@helpdesk.example",
        ),
    ];

    for (id, fullname, email) in users {
        upsert_user(pool, id, fullname, email).await?;
    }

    let tickets: Vec<(i64, &str, &str, Option<&str>, &[(&str, &str)], &[&str])> = vec![
        (
            1000,
            "Printer offline on floor 3",
            "maya.chen@helpdesk.example",
            Some("omar.haddad@helpdesk.example"),
            &[
                ("omar.haddad@helpdesk.example", "Power-cycled the print server."),
                ("maya.chen@helpdesk.example", "Still showing offline here."),
                ("omar.haddad@helpdesk.example", "Replaced the network drop, please retry."),
            ],
            &["created", "assigned", "comment", "comment", "comment"],
        ),
        (
            1001,
            "VPN drops every hour",
            "priya.nair@helpdesk.example",
            Some("omar.haddad@helpdesk.example"),
            &[("omar.haddad@helpdesk.example", "Collecting gateway logs.")],
            &["created", "assigned", "comment"],
        ),
        (
            1002,
            "Password reset for shared mailbox",
            "maya.chen@helpdesk.example",
            None,
            &[],
            &["created"],
        ),
        (
            1003,
            "Laptop battery swelling",
            "priya.nair@helpdesk.example",
            Some("tom.velasquez@helpdesk.example"),
            &[
                ("tom.velasquez@helpdesk.example", "Ordered a replacement unit."),
                ("priya.nair@helpdesk.example", "Thanks, powering it down until then."),
            ],
            &["created", "priority-raised", "assigned", "comment", "comment"],
        ),
    ];

    for (uid, subject, owner_email, assignee_email, comments, history) in tickets {
        let owner_id = user_id_by_email(pool, owner_email).await?;
        let assignee_id = match assignee_email {
            Some(email) => Some(user_id_by_email(pool, email).await?),
            None => None,
        };

        let ticket_id = Uuid::new_v4();
        let result = sqlx::query(
            r#"
            INSERT INTO helpdesk.tickets (id, uid, subject, owner_id, assignee_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (uid) DO NOTHING
            "#,
        )
        .bind(ticket_id)
        .bind(uid)
        .bind(subject)
        .bind(owner_id)
        .bind(assignee_id)
        .execute(pool)
        .await?;

        // Children only on first insert so re-running seed stays idempotent.
        if result.rows_affected() == 0 {
            continue;
        }

        for &(commenter_email, body) in comments {
            let commenter_id = user_id_by_email(pool, commenter_email).await?;
            sqlx::query(
                r#"
                INSERT INTO helpdesk.comments (id, ticket_id, owner_id, body)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(ticket_id)
            .bind(commenter_id)
            .bind(body)
            .execute(pool)
            .await?;
        }

        for &action in history {
            sqlx::query(
                r#"
                INSERT INTO helpdesk.history (id, ticket_id, action)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(ticket_id)
            .bind(action)
            .execute(pool)
            .await?;
        }
    }

    Ok(())
}

/// The full cacheable corpus, relations still unresolved.
pub async fn fetch_for_cache(pool: &PgPool) -> Result<Vec<TicketRow>, StatsError> {
    let ticket_rows = sqlx::query(
        "SELECT id, uid, subject, owner_id, assignee_id FROM helpdesk.tickets ORDER BY uid",
    )
    .fetch_all(pool)
    .await?;

    let mut comments: HashMap<Uuid, Vec<CommentRow>> = HashMap::new();
    let comment_rows = sqlx::query(
        "SELECT ticket_id, owner_id, body FROM helpdesk.comments ORDER BY posted_at",
    )
    .fetch_all(pool)
    .await?;
    for row in comment_rows {
        comments
            .entry(row.get("ticket_id"))
            .or_default()
            .push(CommentRow {
                owner_id: row.get("owner_id"),
                body: row.get("body"),
            });
    }

    let mut history: HashMap<Uuid, Vec<HistoryEvent>> = HashMap::new();
    let history_rows = sqlx::query(
        "SELECT ticket_id, action, occurred_at FROM helpdesk.history ORDER BY occurred_at",
    )
    .fetch_all(pool)
    .await?;
    for row in history_rows {
        history
            .entry(row.get("ticket_id"))
            .or_default()
            .push(HistoryEvent {
                action: row.get("action"),
                occurred_at: row.get("occurred_at"),
            });
    }

    let mut tickets = Vec::new();
    for row in ticket_rows {
        let id: Uuid = row.get("id");
        tickets.push(TicketRow {
            uid: row.get("uid"),
            subject: row.get("subject"),
            owner_id: row.get("owner_id"),
            assignee_id: row.get("assignee_id"),
            comments: comments.remove(&id).unwrap_or_default(),
            history: history.remove(&id).unwrap_or_default(),
        });
    }

    debug!("fetched {} tickets for the stats snapshot", tickets.len());
    Ok(tickets)
}

/// Resolves the owner, comments.owner and assignee relations on the given
/// rows. A dangling user reference fails the whole batch.
pub async fn populate(pool: &PgPool, rows: Vec<TicketRow>) -> Result<Vec<Ticket>, StatsError> {
    let users = fetch_users(pool).await?;
    resolve_tickets(rows, &users)
}

async fn fetch_users(pool: &PgPool) -> Result<HashMap<Uuid, User>, StatsError> {
    let rows = sqlx::query("SELECT id, fullname, email FROM helpdesk.users")
        .fetch_all(pool)
        .await?;

    let mut users = HashMap::new();
    for row in rows {
        users.insert(
            row.get("id"),
            User {
                fullname: row.get("fullname"),
                email: row.get("email"),
            },
        );
    }
    Ok(users)
}

pub fn resolve_tickets(
    rows: Vec<TicketRow>,
    users: &HashMap<Uuid, User>,
) -> Result<Vec<Ticket>, StatsError> {
    rows.into_iter().map(|row| resolve_ticket(row, users)).collect()
}

fn resolve_ticket(row: TicketRow, users: &HashMap<Uuid, User>) -> Result<Ticket, StatsError> {
    let uid = row.uid;
    let lookup = |path: &'static str, user_id: Uuid| {
        users
            .get(&user_id)
            .cloned()
            .ok_or(StatsError::MissingRelation { uid, path, user_id })
    };

    let owner = lookup("owner", row.owner_id)?;
    let assignee = row
        .assignee_id
        .map(|id| lookup("assignee", id))
        .transpose()?;
    let comments = row
        .comments
        .into_iter()
        .map(|comment| {
            Ok(Comment {
                owner: lookup("comments.owner", comment.owner_id)?,
                body: comment.body,
            })
        })
        .collect::<Result<Vec<Comment>, StatsError>>()?;

    Ok(Ticket {
        uid,
        subject: row.subject,
        owner,
        assignee,
        comments,
        history: row.history,
    })
}

async fn upsert_user(
    pool: &PgPool,
    id: Uuid,
    fullname: &str,
    email: &str,
) -> Result<Uuid, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO helpdesk.users (id, fullname, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE
        SET fullname = EXCLUDED.fullname
        RETURNING id
        "#,
    )
    .bind(id)
    .bind(fullname)
    .bind(email)
    .fetch_one(pool)
    .await?;

    Ok(row.get("id"))
}

async fn user_id_by_email(pool: &PgPool, email: &str) -> Result<Uuid, sqlx::Error> {
    let row = sqlx::query("SELECT id FROM helpdesk.users WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(row.get("id"))
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        uid: i64,
        subject: String,
        owner_name: String,
        owner_email: String,
        assignee_name: Option<String>,
        assignee_email: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let owner_id = upsert_user(pool, Uuid::new_v4(), &row.owner_name, &row.owner_email).await?;

        let assignee_id = match (&row.assignee_name, &row.assignee_email) {
            (Some(name), Some(email)) => {
                Some(upsert_user(pool, Uuid::new_v4(), name, email).await?)
            }
            _ => None,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO helpdesk.tickets (id, uid, subject, owner_id, assignee_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (uid) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.uid)
        .bind(&row.subject)
        .bind(owner_id)
        .bind(assignee_id)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
