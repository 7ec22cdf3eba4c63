//! Due checks and the delivery pipeline.
//!
//! A batch walks every active board one at a time. Boards whose interval has
//! not elapsed are skipped silently. Due boards get a quote, a delivery, and
//! one history row; last-sent state only advances on success, so a
//! failed board stays due and is retried by the next batch.
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::delivery::BoardSender;
use crate::model::{
    BoardConfig, DeliveryStatus, DueBatchResult, NewDeliveryLog, Quote, QuoteMode,
};
use crate::providers::ProviderRegistry;
use crate::store::ConfigStore;

#[derive(Debug, Error)]
pub enum TestSendError {
    #[error("No active board settings found. Save settings first.")]
    NoActiveBoard,
    #[error("Board settings unavailable.")]
    BoardUnavailable,
    #[error("{0:#}")]
    Delivery(anyhow::Error),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct TestSendOutcome {
    pub board_id: String,
    pub mode: QuoteMode,
    pub quote: Quote,
}

/// Never-sent boards are always due; otherwise the interval boundary is inclusive.
pub fn is_due(
    last_sent_at: Option<DateTime<Utc>>,
    interval_minutes: i64,
    now: DateTime<Utc>,
) -> bool {
    match last_sent_at {
        None => true,
        Some(last) => (now - last).num_milliseconds() >= interval_minutes.saturating_mul(60_000),
    }
}

struct DeliveryFailure {
    quote: Quote,
    error: anyhow::Error,
}

/// Fetch, send, then persist state and a SUCCESS row.
///
/// Only send and state-update errors count as a failed delivery. Once the
/// board has the quote and its state has moved on, a SUCCESS row that cannot
/// be written is reported and the delivery still counts as sent.
async fn deliver(
    store: &dyn ConfigStore,
    providers: &ProviderRegistry,
    sender: &dyn BoardSender,
    config: &BoardConfig,
    mode: QuoteMode,
    now: DateTime<Utc>,
) -> Result<Quote, DeliveryFailure> {
    let provider = providers.provider_for(mode);
    let quote = provider.next_quote(config.last_quote_ref.as_deref()).await;
    debug!(board_id = %config.board_id, quote_ref = %quote.quote_ref, "quote selected");

    let attempt = async {
        sender.send(&config.credentials, &quote.text).await?;
        store
            .update_last_send_state(&config.board_id, now, Some(&quote.quote_ref))
            .await?;
        anyhow::Ok(())
    }
    .await;
    if let Err(error) = attempt {
        return Err(DeliveryFailure { quote, error });
    }

    let entry = NewDeliveryLog {
        board_id: config.board_id.clone(),
        mode,
        quote_text: quote.text.clone(),
        quote_ref: Some(quote.quote_ref.clone()),
        status: DeliveryStatus::Success,
        error: None,
    };
    if let Err(err) = store.insert_delivery_log(&entry).await {
        error!(?err, board_id = %config.board_id, "failed to record delivery success");
    }
    Ok(quote)
}

async fn record_failure(
    store: &dyn ConfigStore,
    board_id: &str,
    mode: QuoteMode,
    failure: &DeliveryFailure,
) {
    let entry = NewDeliveryLog {
        board_id: board_id.to_string(),
        mode,
        quote_text: failure.quote.text.clone(),
        quote_ref: Some(failure.quote.quote_ref.clone()),
        status: DeliveryStatus::Failure,
        error: Some(format!("{:#}", failure.error)),
    };
    if let Err(err) = store.insert_delivery_log(&entry).await {
        error!(?err, board_id, "failed to record delivery failure");
    }
}

/// Deliver to every active board whose interval has elapsed at `now`.
#[instrument(skip_all)]
pub async fn send_due_quotes(
    store: &dyn ConfigStore,
    providers: &ProviderRegistry,
    sender: &dyn BoardSender,
    now: DateTime<Utc>,
) -> Result<DueBatchResult> {
    let configs = store.get_all_active_runtime_configs().await?;
    let mut result = DueBatchResult {
        scanned: configs.len(),
        ..Default::default()
    };

    for config in &configs {
        if !is_due(config.last_sent_at, config.interval_minutes, now) {
            debug!(board_id = %config.board_id, "not due yet");
            continue;
        }
        result.due += 1;

        match deliver(store, providers, sender, config, config.mode, now).await {
            Ok(quote) => {
                result.sent += 1;
                info!(
                    board_id = %config.board_id,
                    mode = %config.mode,
                    quote_ref = %quote.quote_ref,
                    "quote delivered"
                );
            }
            Err(failure) => {
                result.failed += 1;
                warn!(
                    board_id = %config.board_id,
                    mode = %config.mode,
                    err = %format!("{:#}", failure.error),
                    "quote delivery failed"
                );
                record_failure(store, &config.board_id, config.mode, &failure).await;
            }
        }
    }

    info!(
        scanned = result.scanned,
        due = result.due,
        sent = result.sent,
        failed = result.failed,
        "batch finished"
    );
    Ok(result)
}

/// Deliver one quote right away, ignoring the schedule.
///
/// Picks the active board whose mode matches `mode` (else the first active
/// board) and re-reads it by id before sending.
#[instrument(skip_all)]
pub async fn send_test_quote(
    store: &dyn ConfigStore,
    providers: &ProviderRegistry,
    sender: &dyn BoardSender,
    mode: Option<QuoteMode>,
    now: DateTime<Utc>,
) -> Result<TestSendOutcome, TestSendError> {
    let configs = store.get_all_active_runtime_configs().await?;
    let selected = mode
        .and_then(|m| configs.iter().find(|cfg| cfg.mode == m))
        .or_else(|| configs.first())
        .ok_or(TestSendError::NoActiveBoard)?;

    let fresh = store
        .get_runtime_board_config_by_board_id(&selected.board_id)
        .await?
        .ok_or(TestSendError::BoardUnavailable)?;
    let mode = mode.unwrap_or(fresh.mode);

    match deliver(store, providers, sender, &fresh, mode, now).await {
        Ok(quote) => {
            info!(
                board_id = %fresh.board_id,
                %mode,
                quote_ref = %quote.quote_ref,
                "test quote delivered"
            );
            Ok(TestSendOutcome {
                board_id: fresh.board_id,
                mode,
                quote,
            })
        }
        Err(failure) => {
            warn!(board_id = %fresh.board_id, %mode, "test quote failed");
            record_failure(store, &fresh.board_id, mode, &failure).await;
            Err(TestSendError::Delivery(failure.error))
        }
    }
}

/// Run a batch every `period` until the task is dropped. Batches never overlap.
pub async fn run_ticker(
    store: Arc<dyn ConfigStore>,
    providers: Arc<ProviderRegistry>,
    sender: Arc<dyn BoardSender>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let batch = send_due_quotes(store.as_ref(), &providers, sender.as_ref(), Utc::now());
        if let Err(err) = batch.await {
            error!(?err, "scheduled batch failed");
        }
    }
}
