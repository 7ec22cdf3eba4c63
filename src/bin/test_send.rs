use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;

use quoteboard::config;
use quoteboard::db::SqliteStore;
use quoteboard::delivery::BoardClient;
use quoteboard::model::QuoteMode;
use quoteboard::providers::ProviderRegistry;
use quoteboard::scheduler;

#[derive(Debug, Parser)]
#[command(author, version, about = "Send one quote to the board right now")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Quote source to use instead of the board's configured one (DAILYSCRIPT or RICK_MORTY)
    #[arg(long)]
    mode: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mode = args
        .mode
        .as_deref()
        .map(|raw| QuoteMode::parse_mode(raw).ok_or_else(|| anyhow!("unknown mode {raw}")))
        .transpose()?;

    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.default_database_url());
    let store = SqliteStore::connect(&database_url).await?;
    let providers = ProviderRegistry::from_sources(&cfg.sources, cfg.board.max_chars)?;
    let sender = BoardClient::from_config(&cfg.board)?;

    let outcome = scheduler::send_test_quote(&store, &providers, &sender, mode, Utc::now()).await?;
    println!("[{}] {} ({})", outcome.mode, outcome.quote.text, outcome.quote.quote_ref);

    Ok(())
}
