#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use quoteboard::db::{self, NewBoard, SqliteStore};
use quoteboard::delivery::{BoardSender, DeliveryError};
use quoteboard::model::{
    BoardConfig, Credentials, DeliveryLogEntry, DeliveryStatus, NewDeliveryLog, Quote, QuoteMode,
};
use quoteboard::providers::{ProviderRegistry, QuoteProvider};
use quoteboard::store::ConfigStore;

pub async fn setup_store() -> SqliteStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    SqliteStore::new(pool)
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
}

pub async fn add_board(
    store: &SqliteStore,
    name: &str,
    mode: QuoteMode,
    interval_minutes: i64,
) -> String {
    db::create_board(
        store.pool(),
        &NewBoard {
            name: name.into(),
            credentials: Credentials {
                api_key: format!("{name}-key"),
                api_secret: None,
            },
            mode,
            interval_minutes,
            timezone: "UTC".into(),
            active: true,
        },
    )
    .await
    .unwrap()
}

/// Hands out `<prefix>-0`, `<prefix>-1`, ... in order.
pub struct CountingProvider {
    mode: QuoteMode,
    prefix: &'static str,
    next: Mutex<usize>,
    seen_refs: Mutex<Vec<Option<String>>>,
}

impl CountingProvider {
    pub fn new(mode: QuoteMode, prefix: &'static str) -> Self {
        Self {
            mode,
            prefix,
            next: Mutex::new(0),
            seen_refs: Mutex::new(Vec::new()),
        }
    }

    pub async fn seen_refs(&self) -> Vec<Option<String>> {
        self.seen_refs.lock().await.clone()
    }
}

#[async_trait]
impl QuoteProvider for CountingProvider {
    fn mode(&self) -> QuoteMode {
        self.mode
    }

    async fn next_quote(&self, last_quote_ref: Option<&str>) -> Quote {
        self.seen_refs
            .lock()
            .await
            .push(last_quote_ref.map(str::to_string));
        let mut next = self.next.lock().await;
        let n = *next;
        *next += 1;
        Quote::new(format!("{} quote number {n}", self.mode), format!("{}-{n}", self.prefix))
    }
}

pub fn registry() -> (ProviderRegistry, Arc<CountingProvider>, Arc<CountingProvider>) {
    let ds = Arc::new(CountingProvider::new(QuoteMode::DailyScript, "ds"));
    let rm = Arc::new(CountingProvider::new(QuoteMode::RickMorty, "rm"));
    (ProviderRegistry::new(ds.clone(), rm.clone()), ds, rm)
}

/// Records every send; boards whose key is listed in `failing` always fail.
#[derive(Default)]
pub struct RecordingSender {
    failing: HashSet<String>,
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    pub fn failing_for(keys: &[&str]) -> Self {
        Self {
            failing: keys.iter().map(|k| k.to_string()).collect(),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl BoardSender for RecordingSender {
    async fn send(&self, credentials: &Credentials, message: &str) -> Result<(), DeliveryError> {
        if self.failing.contains(&credentials.api_key) {
            return Err(DeliveryError::Exhausted {
                attempts: vec!["Attempt 1: 503 board offline".to_string()],
            });
        }
        self.sent
            .lock()
            .await
            .push((credentials.api_key.clone(), message.to_string()));
        Ok(())
    }
}

/// Wraps a real store and fails selected writes for selected boards.
pub struct FlakyStore {
    inner: SqliteStore,
    fail_state_for: HashSet<String>,
    fail_log_for: HashSet<(String, DeliveryStatus)>,
}

impl FlakyStore {
    pub fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            fail_state_for: HashSet::new(),
            fail_log_for: HashSet::new(),
        }
    }

    pub fn fail_state_update(mut self, board_id: &str) -> Self {
        self.fail_state_for.insert(board_id.to_string());
        self
    }

    pub fn fail_log(mut self, board_id: &str, status: DeliveryStatus) -> Self {
        self.fail_log_for.insert((board_id.to_string(), status));
        self
    }

    pub fn inner(&self) -> &SqliteStore {
        &self.inner
    }
}

#[async_trait]
impl ConfigStore for FlakyStore {
    async fn get_all_active_runtime_configs(&self) -> Result<Vec<BoardConfig>> {
        self.inner.get_all_active_runtime_configs().await
    }

    async fn get_runtime_board_config_by_board_id(
        &self,
        board_id: &str,
    ) -> Result<Option<BoardConfig>> {
        self.inner.get_runtime_board_config_by_board_id(board_id).await
    }

    async fn update_last_send_state(
        &self,
        board_id: &str,
        sent_at: DateTime<Utc>,
        quote_ref: Option<&str>,
    ) -> Result<()> {
        if self.fail_state_for.contains(board_id) {
            return Err(anyhow!("database is locked"));
        }
        self.inner
            .update_last_send_state(board_id, sent_at, quote_ref)
            .await
    }

    async fn insert_delivery_log(&self, entry: &NewDeliveryLog) -> Result<()> {
        if self
            .fail_log_for
            .contains(&(entry.board_id.clone(), entry.status))
        {
            return Err(anyhow!("disk full"));
        }
        self.inner.insert_delivery_log(entry).await
    }

    async fn list_delivery_logs(&self, limit: u32) -> Result<Vec<DeliveryLogEntry>> {
        self.inner.list_delivery_logs(limit).await
    }
}
