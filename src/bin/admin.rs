//! CLI administration tool for shortlink-resolver.
//!
//! Inspects links and runs maintenance against the database directly,
//! without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Show a link with its counters
//! cargo run --bin admin -- links show promo
//!
//! # Delete every expired link
//! cargo run --bin admin -- links purge-expired
//!
//! # Show totals
//! cargo run --bin admin -- stats
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required): PostgreSQL connection string
//! - `DB_OP_TIMEOUT_MS` (optional): per-query timeout, default 5000
//! - `REDIS_URL` (optional): when set, `purge-expired` also drops the click
//!   counters and event logs of purged codes

use shortlink_resolver::application::services::Reclaimer;
use shortlink_resolver::domain::repositories::LinkRepository;
use shortlink_resolver::infrastructure::cache::RedisCache;
use shortlink_resolver::infrastructure::persistence::PgLinkRepository;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// CLI tool for managing shortlink-resolver.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Inspect and maintain links
    Links {
        #[command(subcommand)]
        action: LinkAction,
    },

    /// Show statistics
    Stats,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum LinkAction {
    /// Show a single link
    Show {
        /// Short code
        code: String,
    },

    /// Delete all links past their expiry
    PurgeExpired {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let op_timeout = std::env::var("DB_OP_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5));

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Links { action } => handle_link_action(action, &pool, op_timeout).await?,
        Commands::Stats => handle_stats(&pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

async fn handle_link_action(action: LinkAction, pool: &PgPool, op_timeout: Duration) -> Result<()> {
    let repo: Arc<dyn LinkRepository> =
        Arc::new(PgLinkRepository::new(Arc::new(pool.clone()), op_timeout));

    match action {
        LinkAction::Show { code } => show_link(repo, &code).await?,
        LinkAction::PurgeExpired { yes } => purge_expired(repo, pool, yes).await?,
    }

    Ok(())
}

/// Prints one link with its state and durable click count.
///
/// # Output Format
///
/// ```text
/// 🔗 promo
///
///   Target:   https://example.com/page
///   Owner:    alice
///   Status:   ACTIVE
///   Clicks:   42
///   Created:  2025-03-10 12:00
///   Expires:  2025-04-09 12:00
/// ```
async fn show_link(repo: Arc<dyn LinkRepository>, code: &str) -> Result<()> {
    let link = repo
        .find_by_code(code)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?
        .context("Link not found")?;

    let now = Utc::now();
    let status = if link.is_expired(now) {
        "EXPIRED".red()
    } else if !link.active {
        "INACTIVE".yellow()
    } else {
        "ACTIVE".green()
    };

    println!("{} {}", "🔗".bright_blue(), link.code.bright_white().bold());
    println!();
    println!("  Target:   {}", link.target.cyan());
    println!(
        "  Owner:    {}",
        link.owner.as_deref().unwrap_or("(anonymous)").bright_white()
    );
    println!("  Status:   {}", status);
    println!(
        "  Clicks:   {}",
        link.click_count.to_string().bright_green().bold()
    );
    println!(
        "  Created:  {}",
        link.created_at.format("%Y-%m-%d %H:%M").to_string().bright_black()
    );
    println!(
        "  Expires:  {}",
        link.expires_at.format("%Y-%m-%d %H:%M").to_string().bright_black()
    );
    for (key, value) in &link.metadata {
        println!("  {}: {}", key.bright_black(), value);
    }
    println!();

    Ok(())
}

/// Deletes expired links after confirmation (default: No).
async fn purge_expired(repo: Arc<dyn LinkRepository>, pool: &PgPool, skip_confirm: bool) -> Result<()> {
    println!("{}", "🧹 Purge Expired Links".bright_blue().bold());
    println!();

    let pending: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM short_links WHERE expires_at <= NOW()")
            .fetch_one(pool)
            .await?;

    if pending == 0 {
        println!("{}", "  No expired links".yellow());
        return Ok(());
    }

    println!(
        "  Expired links: {}",
        pending.to_string().bright_white().bold()
    );
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Delete them permanently?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let mut reclaimer = Reclaimer::new(repo, Duration::ZERO);
    if let Ok(redis_url) = std::env::var("REDIS_URL") {
        let redis = RedisCache::connect(&redis_url, Duration::from_secs(2), Duration::from_millis(500))
            .await
            .context("Failed to connect to Redis")?;
        reclaimer = reclaimer.with_cache(Arc::new(redis));
    }

    let purged = reclaimer
        .run_once()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to purge expired links: {}", e))?;

    println!();
    println!(
        "{} {}",
        "✅ Purged".green().bold(),
        format!("{purged} links").bright_white()
    );
    println!();

    Ok(())
}

/// Displays link and click totals.
async fn handle_stats(pool: &PgPool) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let (links, active, clicks): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE active AND expires_at > NOW()),
               COALESCE(SUM(click_count), 0)::BIGINT
        FROM short_links
        "#,
    )
    .fetch_one(pool)
    .await?;

    println!("  Links:         {}", links.to_string().bright_green().bold());
    println!("  Resolvable:    {}", active.to_string().bright_green().bold());
    println!("  Clicks:        {}", clicks.to_string().bright_green().bold());
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!();
        }
    }

    Ok(())
}
