use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod db;
mod error;
mod models;
mod report;
mod stats;

#[derive(Parser)]
#[command(name = "helpdesk-stats")]
#[command(about = "Dashboard quick statistics for the helpdesk ticket corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import tickets from a CSV export
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Compute and print the dashboard quick stats
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown dashboard report
    Report {
        #[arg(long, default_value = "dashboard.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the helpdesk Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} tickets from {}.", csv.display());
        }
        Commands::Stats { json } => {
            let stats = stats::quick_stats(&pool, None).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!(
                    "Most requester:     {}",
                    report::leaderboard_cell(stats.most_requester.as_ref())
                );
                println!(
                    "Most commenter:     {}",
                    report::leaderboard_cell(stats.most_commenter.as_ref())
                );
                println!(
                    "Most assignee:      {}",
                    report::leaderboard_cell(stats.most_assignee.as_ref())
                );
                println!(
                    "Most active ticket: {}",
                    report::activity_cell(stats.most_active_ticket.as_ref())
                );
            }
        }
        Commands::Report { out } => {
            let rows = db::fetch_for_cache(&pool).await?;
            let tickets = db::populate(&pool, rows).await?;
            let report = report::build_report(&tickets, Utc::now().date_naive());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
