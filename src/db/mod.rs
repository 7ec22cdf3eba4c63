//! Database module: row mapping and SQL repositories.
//!
//! This module is split into two submodules:
//! - `model`: maps rows into the domain types from `crate::model`.
//! - `repo`: SQL-only functions over a `Pool`.
//!
//! `SqliteStore` wraps a pool and implements the `ConfigStore` contract the
//! scheduler depends on, plus the settings operations used by the HTTP API.

pub mod model;
pub mod repo;

pub use repo::*;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{BoardConfig, DeliveryLogEntry, NewDeliveryLog};
use crate::settings::{PublicSettings, SettingsError, SettingsInput};
use crate::store::ConfigStore;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool,
}

impl SqliteStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) and migrate the database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = repo::init_pool(database_url).await?;
        repo::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub async fn get_public_settings(&self) -> Result<Option<PublicSettings>> {
        repo::fetch_public_settings(&self.pool).await
    }

    pub async fn upsert_settings(
        &self,
        input: &SettingsInput,
    ) -> Result<PublicSettings, SettingsError> {
        let update = input.validate()?;
        if repo::upsert_settings(&self.pool, &update).await?.is_none() {
            return Err(SettingsError::MissingApiKey);
        }
        repo::fetch_public_settings(&self.pool)
            .await?
            .ok_or_else(|| SettingsError::Store(anyhow::anyhow!("settings vanished after save")))
    }
}

#[async_trait]
impl ConfigStore for SqliteStore {
    async fn get_all_active_runtime_configs(&self) -> Result<Vec<BoardConfig>> {
        repo::fetch_active_configs(&self.pool).await
    }

    async fn get_runtime_board_config_by_board_id(
        &self,
        board_id: &str,
    ) -> Result<Option<BoardConfig>> {
        repo::fetch_config_by_board_id(&self.pool, board_id).await
    }

    async fn update_last_send_state(
        &self,
        board_id: &str,
        sent_at: DateTime<Utc>,
        quote_ref: Option<&str>,
    ) -> Result<()> {
        repo::update_last_send_state(&self.pool, board_id, sent_at, quote_ref).await
    }

    async fn insert_delivery_log(&self, entry: &NewDeliveryLog) -> Result<()> {
        repo::insert_delivery_log(&self.pool, entry).await?;
        Ok(())
    }

    async fn list_delivery_logs(&self, limit: u32) -> Result<Vec<DeliveryLogEntry>> {
        repo::list_delivery_logs(&self.pool, limit).await
    }
}
