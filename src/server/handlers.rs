//! Route handlers. Each one resolves to `{ok: true, ...}` or an `AppError`.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::auth::CronAuthorized;
use super::error::AppError;
use super::AppState;
use crate::model::QuoteMode;
use crate::scheduler;
use crate::settings::SettingsInput;
use crate::store::ConfigStore;

pub const DEFAULT_LOG_LIMIT: u32 = 50;
pub const MAX_LOG_LIMIT: u32 = 200;

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({
        "ok": true,
        "service": env!("CARGO_PKG_NAME"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// POST /api/jobs/send-quotes
pub async fn send_quotes(
    _auth: CronAuthorized,
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let result = scheduler::send_due_quotes(
        state.store.as_ref(),
        &state.providers,
        state.sender.as_ref(),
        Utc::now(),
    )
    .await?;
    Ok(Json(json!({ "ok": true, "result": result })))
}

#[derive(Debug, Default, Deserialize)]
struct TestSendBody {
    #[serde(default)]
    mode: Option<QuoteMode>,
}

/// An empty body means "no preference"; anything else must be valid JSON.
fn parse_test_send_body(body: &[u8]) -> Result<TestSendBody, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(TestSendBody::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))
}

/// POST /api/test-send
pub async fn test_send(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let request = parse_test_send_body(&body)?;
    let outcome = scheduler::send_test_quote(
        state.store.as_ref(),
        &state.providers,
        state.sender.as_ref(),
        request.mode,
        Utc::now(),
    )
    .await?;

    info!(board_id = %outcome.board_id, mode = %outcome.mode, "test send requested");
    Ok(Json(json!({
        "ok": true,
        "message": "Quote delivered to Vestaboard.",
        "quote": outcome.quote,
    })))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    limit: Option<String>,
}

/// Unparsable or absent limits fall back to the default; others are clamped.
pub fn resolve_log_limit(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .map(|n| n.clamp(1, MAX_LOG_LIMIT as i64) as u32)
        .unwrap_or(DEFAULT_LOG_LIMIT)
}

/// GET /api/logs?limit=N
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Value>, AppError> {
    let limit = resolve_log_limit(query.limit.as_deref());
    let items = state.store.list_delivery_logs(limit).await?;
    Ok(Json(json!({ "ok": true, "items": items })))
}

/// GET /api/settings
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let settings = state.store.get_public_settings().await?;
    Ok(Json(json!({ "ok": true, "settings": settings })))
}

/// POST /api/settings
pub async fn save_settings(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let input: SettingsInput = serde_json::from_slice(&body).map_err(|e| AppError::Validation {
        message: "Invalid settings payload".to_string(),
        issues: vec![e.to_string()],
    })?;
    let settings = state.store.upsert_settings(&input).await?;
    info!(mode = %settings.mode, interval = settings.interval_minutes, "settings saved");
    Ok(Json(json!({ "ok": true, "settings": settings })))
}
