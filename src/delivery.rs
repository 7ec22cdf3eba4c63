//! Client for the board's write endpoint.
//!
//! Messages are flattened to a single line and cut to what the display can
//! show before sending. Each send is retried a bounded number of times with a
//! linear backoff; when every attempt fails the error carries the diagnostic
//! of each attempt, not just the last one.
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Url};
use serde_json::json;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::Board;
use crate::model::Credentials;

/// Header carrying the per-board write key.
pub const WRITE_KEY_HEADER: &str = "X-Vestaboard-Read-Write-Key";
/// Character capacity of a 6x22 flap display.
pub const DEFAULT_MAX_CHARS: usize = 132;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("board delivery failed. {}", .attempts.join(" | "))]
    Exhausted { attempts: Vec<String> },
}

impl DeliveryError {
    pub fn attempts(&self) -> &[String] {
        match self {
            DeliveryError::Exhausted { attempts } => attempts,
        }
    }
}

#[async_trait]
pub trait BoardSender: Send + Sync {
    async fn send(&self, credentials: &Credentials, message: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(400),
        }
    }
}

impl RetryPolicy {
    /// Wait after the 1-based `attempt` failed: `attempt × base`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

#[derive(Clone)]
pub struct BoardClient {
    http: Client,
    endpoint: Url,
    policy: RetryPolicy,
    max_chars: usize,
}

impl fmt::Debug for BoardClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardClient")
            .field("endpoint", &self.endpoint)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl BoardClient {
    pub fn new(endpoint: Url, policy: RetryPolicy, max_chars: usize) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("quoteboard/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(15))
            .build()
            .context("failed to build board HTTP client")?;
        Ok(Self {
            http,
            endpoint,
            policy,
            max_chars,
        })
    }

    pub fn from_config(board: &Board) -> Result<Self> {
        let endpoint = Url::parse(&board.endpoint).context("invalid board endpoint")?;
        let policy = RetryPolicy {
            max_attempts: board.max_attempts,
            base_delay: Duration::from_millis(board.backoff_base_ms),
        };
        Self::new(endpoint, policy, board.max_chars)
    }

    pub fn build_request(&self, credentials: &Credentials, text: &str) -> Result<reqwest::Request> {
        self.http
            .post(self.endpoint.clone())
            .header(WRITE_KEY_HEADER, &credentials.api_key)
            .header("Content-Type", "application/json")
            .json(&json!({ "text": text }))
            .build()
            .context("failed to build board request")
    }

    async fn attempt(&self, credentials: &Credentials, text: &str) -> Result<(), String> {
        let request = self
            .build_request(credentials, text)
            .map_err(|err| format!("{err:#}"))?;
        let res = self
            .http
            .execute(request)
            .await
            .map_err(|err| err.to_string())?;
        if res.status().is_success() {
            return Ok(());
        }
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        Err(format!("{} {}", status.as_u16(), body.trim()))
    }
}

#[async_trait]
impl BoardSender for BoardClient {
    #[instrument(skip_all)]
    async fn send(&self, credentials: &Credentials, message: &str) -> Result<(), DeliveryError> {
        let text = normalize_message(message, self.max_chars);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts = Vec::new();

        for attempt in 1..=max_attempts {
            match self.attempt(credentials, &text).await {
                Ok(()) => {
                    info!(attempt, chars = text.chars().count(), "board accepted message");
                    return Ok(());
                }
                Err(diagnostic) => {
                    warn!(attempt, %diagnostic, "board delivery attempt failed");
                    attempts.push(format!("Attempt {attempt}: {diagnostic}"));
                }
            }
            if attempt < max_attempts {
                tokio::time::sleep(self.policy.delay_after(attempt)).await;
            }
        }

        Err(DeliveryError::Exhausted { attempts })
    }
}

/// Collapse whitespace runs, trim, and cut to `max_chars` characters.
pub fn normalize_message(message: &str, max_chars: usize) -> String {
    let collapsed = WHITESPACE_RE.replace_all(message, " ");
    truncate_chars(collapsed.trim(), max_chars)
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
