//! The narrow persistence contract the delivery pipeline depends on.
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{BoardConfig, DeliveryLogEntry, NewDeliveryLog};

#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Configs that are active and whose board is active, in storage order.
    async fn get_all_active_runtime_configs(&self) -> Result<Vec<BoardConfig>>;

    async fn get_runtime_board_config_by_board_id(&self, board_id: &str)
        -> Result<Option<BoardConfig>>;

    async fn update_last_send_state(
        &self,
        board_id: &str,
        sent_at: DateTime<Utc>,
        quote_ref: Option<&str>,
    ) -> Result<()>;

    /// Append one history row; `sent_at` is assigned by the store.
    async fn insert_delivery_log(&self, entry: &NewDeliveryLog) -> Result<()>;

    /// Most recent entries first.
    async fn list_delivery_logs(&self, limit: u32) -> Result<Vec<DeliveryLogEntry>>;
}
