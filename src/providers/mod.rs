//! Quote sources.
//!
//! Each provider fetches a fresh list from its upstream on every call and
//! picks one entry, avoiding the previously delivered ref when it can.
//! Providers never fail: upstream problems turn into fallback quotes whose
//! refs say what went wrong, so the pipeline can still deliver and log.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Sources;
use crate::model::{Quote, QuoteMode};

pub mod json_quotes;
pub mod script_site;

pub use json_quotes::JsonQuotesProvider;
pub use script_site::ScriptSiteProvider;

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn mode(&self) -> QuoteMode;

    async fn next_quote(&self, last_quote_ref: Option<&str>) -> Quote;
}

/// Maps a board's mode to the provider that feeds it.
#[derive(Clone)]
pub struct ProviderRegistry {
    script_site: Arc<dyn QuoteProvider>,
    json_quotes: Arc<dyn QuoteProvider>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry").finish_non_exhaustive()
    }
}

impl ProviderRegistry {
    pub fn new(script_site: Arc<dyn QuoteProvider>, json_quotes: Arc<dyn QuoteProvider>) -> Self {
        Self {
            script_site,
            json_quotes,
        }
    }

    /// Build the real HTTP-backed providers. `max_chars` is the display ceiling
    /// enforced by the JSON source.
    pub fn from_sources(sources: &Sources, max_chars: usize) -> Result<Self> {
        let http = Client::builder()
            .user_agent(sources.user_agent.clone())
            .timeout(Duration::from_secs(20))
            .build()
            .context("failed to build quote source HTTP client")?;
        let script_url =
            Url::parse(&sources.script_site_url).context("invalid script site URL")?;
        let json_url = Url::parse(&sources.json_quotes_url).context("invalid JSON quotes URL")?;

        Ok(Self::new(
            Arc::new(ScriptSiteProvider::new(http.clone(), script_url)),
            Arc::new(JsonQuotesProvider::new(http, json_url, max_chars)),
        ))
    }

    pub fn provider_for(&self, mode: QuoteMode) -> Arc<dyn QuoteProvider> {
        match mode {
            QuoteMode::DailyScript => Arc::clone(&self.script_site),
            // Every other mode is served by the JSON source.
            _ => Arc::clone(&self.json_quotes),
        }
    }
}
