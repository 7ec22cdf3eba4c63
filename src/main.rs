use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use quoteboard::config;
use quoteboard::db::SqliteStore;
use quoteboard::delivery::{BoardClient, BoardSender};
use quoteboard::providers::ProviderRegistry;
use quoteboard::scheduler;
use quoteboard::server::{self, AppState};
use quoteboard::store::ConfigStore;

#[derive(Debug, Parser)]
#[command(author, version, about)]
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
    let store = Arc::new(SqliteStore::connect(&database_url).await?);
    let providers = Arc::new(ProviderRegistry::from_sources(&cfg.sources, cfg.board.max_chars)?);
    let sender: Arc<dyn BoardSender> = Arc::new(BoardClient::from_config(&cfg.board)?);

    if !cfg.missing_cron_settings().is_empty() {
        info!(missing = ?cfg.missing_cron_settings(), "cron trigger disabled until configured");
    }

    // In-process ticker, single task so batches never overlap
    if let Some(period) = cfg.tick_interval() {
        let ticker_store: Arc<dyn ConfigStore> = store.clone();
        tokio::spawn(scheduler::run_ticker(
            ticker_store,
            providers.clone(),
            sender.clone(),
            period,
        ));
        info!(secs = period.as_secs(), "ticker started");
    }

    let state = AppState::new(&cfg, store, providers, sender);
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.bind))?;
    info!(addr = %cfg.server.bind, "serving http api");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
