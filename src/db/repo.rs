use super::model::{
    board_config_from_row, delivery_log_from_row, public_settings_from_row, CONFIG_COLUMNS,
};
use crate::model::{BoardConfig, Credentials, DeliveryLogEntry, NewDeliveryLog, QuoteMode};
use crate::settings::{PublicSettings, SettingsUpdate};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use tracing::instrument;
use uuid::Uuid;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    // WAL and stricter durability.
    let options = SqliteConnectOptions::from_str(&normalized)
        .with_context(|| format!("invalid database URL {normalized}"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = format!("sqlite://{expanded_path}");
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn fetch_active_configs(pool: &Pool) -> Result<Vec<BoardConfig>> {
    let rows = sqlx::query(&format!(
        "SELECT {CONFIG_COLUMNS} FROM quote_configs q JOIN boards b ON b.id = q.board_id \
         WHERE q.active = 1 AND b.active = 1 ORDER BY q.created_at ASC, q.rowid ASC"
    ))
    .fetch_all(pool)
    .await?;
    rows.iter().map(board_config_from_row).collect()
}

#[instrument(skip_all)]
pub async fn fetch_config_by_board_id(pool: &Pool, board_id: &str) -> Result<Option<BoardConfig>> {
    let row = sqlx::query(&format!(
        "SELECT {CONFIG_COLUMNS} FROM quote_configs q JOIN boards b ON b.id = q.board_id \
         WHERE q.board_id = ?"
    ))
    .bind(board_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(board_config_from_row).transpose()
}

#[instrument(skip_all)]
pub async fn update_last_send_state(
    pool: &Pool,
    board_id: &str,
    sent_at: DateTime<Utc>,
    quote_ref: Option<&str>,
) -> Result<()> {
    let res = sqlx::query(
        "UPDATE quote_configs SET last_sent_at = ?, last_quote_ref = ? WHERE board_id = ?",
    )
    .bind(sent_at)
    .bind(quote_ref)
    .bind(board_id)
    .execute(pool)
    .await
    .context("failed to persist last send state")?;
    if res.rows_affected() == 0 {
        return Err(anyhow!("no quote config for board {}", board_id));
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn insert_delivery_log(pool: &Pool, entry: &NewDeliveryLog) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO delivery_logs \
         (id, board_id, mode, quote_text, quote_ref, status, error, sent_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&entry.board_id)
    .bind(entry.mode.as_str())
    .bind(&entry.quote_text)
    .bind(entry.quote_ref.as_deref())
    .bind(entry.status.as_str())
    .bind(entry.error.as_deref())
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("failed to append delivery log")?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn list_delivery_logs(pool: &Pool, limit: u32) -> Result<Vec<DeliveryLogEntry>> {
    let rows = sqlx::query(
        "SELECT l.id, l.board_id, b.name AS board_name, l.mode, l.quote_text, l.quote_ref, \
                l.status, l.error, l.sent_at \
         FROM delivery_logs l LEFT JOIN boards b ON b.id = l.board_id \
         ORDER BY l.sent_at DESC, l.rowid DESC LIMIT ?",
    )
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;
    rows.iter().map(delivery_log_from_row).collect()
}

/// Fields for a brand-new board and its schedule.
#[derive(Debug, Clone)]
pub struct NewBoard {
    pub name: String,
    pub credentials: Credentials,
    pub mode: QuoteMode,
    pub interval_minutes: i64,
    pub timezone: String,
    pub active: bool,
}

#[instrument(skip_all)]
pub async fn create_board(pool: &Pool, board: &NewBoard) -> Result<String> {
    let mut tx = pool.begin().await?;
    let board_id = create_board_tx(&mut tx, board).await?;
    tx.commit().await?;
    Ok(board_id)
}

async fn create_board_tx(tx: &mut Transaction<'_, Sqlite>, board: &NewBoard) -> Result<String> {
    let board_id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO boards (id, name, api_key, api_secret, active) VALUES (?, ?, ?, ?, ?)")
        .bind(&board_id)
        .bind(&board.name)
        .bind(&board.credentials.api_key)
        .bind(board.credentials.api_secret.as_deref())
        .bind(board.active)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        "INSERT INTO quote_configs (id, board_id, mode, interval_minutes, timezone, active) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&board_id)
    .bind(board.mode.as_str())
    .bind(board.interval_minutes)
    .bind(&board.timezone)
    .bind(board.active)
    .execute(&mut **tx)
    .await?;
    Ok(board_id)
}

/// Settings of the first configured board, if any.
#[instrument(skip_all)]
pub async fn fetch_public_settings(pool: &Pool) -> Result<Option<PublicSettings>> {
    let row = sqlx::query(&format!(
        "SELECT {CONFIG_COLUMNS} FROM quote_configs q JOIN boards b ON b.id = q.board_id \
         ORDER BY q.created_at ASC, q.rowid ASC LIMIT 1"
    ))
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(public_settings_from_row).transpose()
}

/// Create the first board, or update it in place. Returns `None` when no board
/// exists yet and the update carries no API key.
#[instrument(skip_all)]
pub async fn upsert_settings(pool: &Pool, update: &SettingsUpdate) -> Result<Option<String>> {
    let mut tx = pool.begin().await?;
    let existing: Option<(String, String)> = sqlx::query_as(
        "SELECT id, board_id FROM quote_configs ORDER BY created_at ASC, rowid ASC LIMIT 1",
    )
    .fetch_optional(&mut *tx)
    .await?;

    let board_id = match existing {
        Some((config_id, board_id)) => {
            sqlx::query(
                "UPDATE boards SET name = ?, active = ?, api_key = COALESCE(?, api_key), \
                 api_secret = COALESCE(?, api_secret) WHERE id = ?",
            )
            .bind(&update.board_name)
            .bind(update.active)
            .bind(update.api_key.as_deref())
            .bind(update.api_secret.as_deref())
            .bind(&board_id)
            .execute(&mut *tx)
            .await?;
            sqlx::query(
                "UPDATE quote_configs SET mode = ?, interval_minutes = ?, timezone = ?, active = ? \
                 WHERE id = ?",
            )
            .bind(update.mode.as_str())
            .bind(update.interval_minutes)
            .bind(&update.timezone)
            .bind(update.active)
            .bind(&config_id)
            .execute(&mut *tx)
            .await?;
            board_id
        }
        None => {
            let Some(api_key) = update.api_key.clone() else {
                return Ok(None);
            };
            let board = NewBoard {
                name: update.board_name.clone(),
                credentials: Credentials {
                    api_key,
                    api_secret: update.api_secret.clone(),
                },
                mode: update.mode,
                interval_minutes: update.interval_minutes,
                timezone: update.timezone.clone(),
                active: update.active,
            };
            create_board_tx(&mut tx, &board).await?
        }
    };

    tx.commit().await?;
    Ok(Some(board_id))
}
