//! Row mapping for the repository queries.
//!
//! Keep these focused on turning rows into domain types. Business logic
//! should live in higher layers.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::model::{BoardConfig, Credentials, DeliveryLogEntry, DeliveryStatus, QuoteMode};
use crate::settings::{mask_value, PublicSettings};

/// Columns selected by every runtime-config query, joined over `boards`.
pub(crate) const CONFIG_COLUMNS: &str = "q.board_id, b.name AS board_name, q.mode, \
     q.interval_minutes, q.timezone, q.active AS config_active, b.active AS board_active, \
     q.last_sent_at, q.last_quote_ref, b.api_key, b.api_secret";

fn parse_mode(raw: &str) -> Result<QuoteMode> {
    QuoteMode::parse_mode(raw).ok_or_else(|| anyhow!("unknown quote mode {raw}"))
}

pub(crate) fn board_config_from_row(row: &SqliteRow) -> Result<BoardConfig> {
    let mode: String = row.try_get("mode")?;
    let config_active: bool = row.try_get("config_active")?;
    let board_active: bool = row.try_get("board_active")?;

    Ok(BoardConfig {
        board_id: row.try_get("board_id")?,
        board_name: row.try_get("board_name")?,
        mode: parse_mode(&mode)?,
        interval_minutes: row.try_get("interval_minutes")?,
        timezone: row.try_get("timezone")?,
        active: config_active && board_active,
        last_sent_at: row.try_get::<Option<DateTime<Utc>>, _>("last_sent_at")?,
        last_quote_ref: row.try_get::<Option<String>, _>("last_quote_ref")?,
        credentials: Credentials {
            api_key: row.try_get("api_key")?,
            api_secret: row.try_get::<Option<String>, _>("api_secret")?,
        },
    })
}

pub(crate) fn delivery_log_from_row(row: &SqliteRow) -> Result<DeliveryLogEntry> {
    let mode: String = row.try_get("mode")?;
    let status: String = row.try_get("status")?;

    Ok(DeliveryLogEntry {
        id: row.try_get("id")?,
        board_id: row.try_get("board_id")?,
        board_name: row.try_get::<Option<String>, _>("board_name")?,
        mode: parse_mode(&mode)?,
        quote_text: row.try_get("quote_text")?,
        quote_ref: row.try_get::<Option<String>, _>("quote_ref")?,
        status: DeliveryStatus::parse_status(&status)
            .ok_or_else(|| anyhow!("unknown delivery status {status}"))?,
        error: row.try_get::<Option<String>, _>("error")?,
        sent_at: row.try_get("sent_at")?,
    })
}

pub(crate) fn public_settings_from_row(row: &SqliteRow) -> Result<PublicSettings> {
    let config = board_config_from_row(row)?;
    Ok(PublicSettings {
        api_key_masked: mask_value(&config.credentials.api_key),
        has_api_secret: config.credentials.api_secret.is_some(),
        board_name: config.board_name,
        mode: config.mode,
        interval_minutes: config.interval_minutes,
        timezone: config.timezone,
        active: config.active,
    })
}
