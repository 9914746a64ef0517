use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use slack_bestof::config::{self, Config, DatabaseTarget};
use slack_bestof::db::Database;

/// slack-bestof: find the most-reacted messages in your Slack channels.
///
/// Syncs channel history into a local store, then prints three leaderboards:
/// messages by distinct reactors, messages by share of members who reacted,
/// and the most-used reactions.
#[derive(Parser)]
#[command(name = "slack-bestof", version, about)]
struct Cli {
    /// Slack API token (bot or user token with channels:history and team:read)
    #[arg(short = 't', long, env = "SLACK_API_TOKEN", hide_env_values = true)]
    slack_api_token: String,

    /// SQLite path or postgres:// URL for the message store
    #[arg(short = 'm', long, env = "DATABASE_URL", default_value = config::DEFAULT_DB_PATH)]
    database_url: String,

    /// Don't sync from Slack, just report on what's already stored
    #[arg(short = 's', long)]
    skip_slack_sync: bool,

    /// JSON file mapping channel id to channel name
    #[arg(short = 'c', long, env = "SLACK_CHANNELS_FILE")]
    slack_channels_file: PathBuf,

    /// Number of entries per leaderboard
    #[arg(short = 'l', long, default_value_t = config::DEFAULT_LEADERBOARD_SIZE)]
    leaderboard_size: usize,

    /// Slack Web API base URL
    #[arg(long, env = "SLACK_API_URL", default_value = slack_bestof::slack::client::DEFAULT_SLACK_API_URL)]
    slack_api_url: String,

    /// Messages requested per history page (1-1000)
    #[arg(long, default_value_t = config::DEFAULT_PAGE_SIZE)]
    page_size: u32,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Config {
            slack_api_token: cli.slack_api_token,
            slack_api_url: cli.slack_api_url,
            database_url: cli.database_url,
            channels_file: cli.slack_channels_file,
            skip_sync: cli.skip_slack_sync,
            leaderboard_size: cli.leaderboard_size,
            page_size: cli.page_size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Logs go to stderr so the report on stdout stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("slack_bestof=info")),
        )
        .init();

    let config: Config = Cli::parse().into();
    config.validate()?;
    let channels = config.channels()?;
    let channel_ids = config::channel_ids(&channels);

    let db = open_database(&config).await?;

    let created = slack_bestof::db::indexes::ensure_indexes(db.as_ref())
        .await
        .context("Failed to prepare message indexes")?;
    if !created.is_empty() {
        info!(indexes = ?created, "Created indexes");
    }

    let slack =
        slack_bestof::slack::client::SlackClient::new(&config.slack_api_url, &config.slack_api_token)?;

    // One engine for every Slack call, so they all share one throttle
    let mut engine =
        slack_bestof::pipeline::sync::SyncEngine::new(&slack, db.as_ref(), config.page_size);

    if config.skip_sync {
        info!("Skipping Slack sync");
    } else {
        let stats = engine.run(&channels).await?;
        slack_bestof::output::terminal::display_sync_summary(&stats);
    }

    let stored = db.message_count().await?;
    info!(messages = stored, "Scoring stored messages");

    let tenure = slack_bestof::scoring::tenure::build_tenure_map(db.as_ref(), &channel_ids).await?;

    let team_domain = engine.team_domain().await?;

    let boards = slack_bestof::scoring::leaderboard::compute_leaderboards(
        db.as_ref(),
        &channel_ids,
        &tenure,
        &team_domain,
        config.leaderboard_size,
    )
    .await?;

    slack_bestof::output::terminal::display_report(&boards);

    Ok(())
}

/// Select the database backend from the configured URL.
///
/// A postgres:// URL uses the Postgres backend (requires the `postgres`
/// feature). Anything else is a SQLite file path.
async fn open_database(config: &Config) -> Result<Arc<dyn Database>> {
    match config.database_target() {
        DatabaseTarget::Postgres(url) => {
            #[cfg(feature = "postgres")]
            {
                info!("Using PostgreSQL backend");
                slack_bestof::db::connect_postgres(&url).await
            }
            #[cfg(not(feature = "postgres"))]
            {
                let _ = url;
                anyhow::bail!(
                    "DATABASE_URL points to PostgreSQL but the 'postgres' feature is not compiled in.\n\
                     Rebuild with: cargo build --features postgres"
                )
            }
        }
        DatabaseTarget::Sqlite(path) => {
            #[cfg(feature = "sqlite")]
            {
                info!(path = %path, "Using SQLite backend");
                slack_bestof::db::open_sqlite(&path)
            }
            #[cfg(not(feature = "sqlite"))]
            {
                let _ = path;
                anyhow::bail!(
                    "DATABASE_URL is a SQLite path but the 'sqlite' feature is not compiled in.\n\
                     Rebuild with: cargo build --features sqlite"
                )
            }
        }
    }
}
