use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use quoteboard::config;
use quoteboard::db::SqliteStore;
use quoteboard::delivery::BoardClient;
use quoteboard::providers::ProviderRegistry;
use quoteboard::scheduler;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Deliver quotes to every due board once and exit (for system cron)"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.default_database_url());
    let store = SqliteStore::connect(&database_url).await?;
    let providers = ProviderRegistry::from_sources(&cfg.sources, cfg.board.max_chars)?;
    let sender = BoardClient::from_config(&cfg.board)?;

    let result = scheduler::send_due_quotes(&store, &providers, &sender, Utc::now()).await?;
    info!(sent = result.sent, failed = result.failed, "send-due finished");
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
