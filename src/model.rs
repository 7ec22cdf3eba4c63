use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QuoteMode {
    #[serde(rename = "DAILYSCRIPT")]
    DailyScript,
    #[serde(rename = "RICK_MORTY")]
    RickMorty,
}

impl QuoteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteMode::DailyScript => "DAILYSCRIPT",
            QuoteMode::RickMorty => "RICK_MORTY",
        }
    }

    pub fn parse_mode(s: &str) -> Option<Self> {
        match s {
            "DAILYSCRIPT" => Some(QuoteMode::DailyScript),
            "RICK_MORTY" => Some(QuoteMode::RickMorty),
            _ => None,
        }
    }
}

impl fmt::Display for QuoteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryStatus {
    Success,
    Failure,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Success => "SUCCESS",
            DeliveryStatus::Failure => "FAILURE",
        }
    }

    pub fn parse_status(s: &str) -> Option<Self> {
        match s {
            "SUCCESS" => Some(DeliveryStatus::Success),
            "FAILURE" => Some(DeliveryStatus::Failure),
            _ => None,
        }
    }
}

/// Write credentials for a single board. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("has_api_secret", &self.api_secret.is_some())
            .finish()
    }
}

/// Runtime snapshot of a board and its quote schedule.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub board_id: String,
    pub board_name: String,
    pub mode: QuoteMode,
    pub interval_minutes: i64,
    /// Informational only; due checks run on absolute time.
    pub timezone: String,
    pub active: bool,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub last_quote_ref: Option<String>,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    pub text: String,
    #[serde(rename = "ref")]
    pub quote_ref: String,
}

impl Quote {
    pub fn new(text: impl Into<String>, quote_ref: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quote_ref: quote_ref.into(),
        }
    }
}

/// Row to append to the delivery history.
#[derive(Debug, Clone)]
pub struct NewDeliveryLog {
    pub board_id: String,
    pub mode: QuoteMode,
    pub quote_text: String,
    pub quote_ref: Option<String>,
    pub status: DeliveryStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryLogEntry {
    pub id: String,
    pub board_id: String,
    pub board_name: Option<String>,
    pub mode: QuoteMode,
    pub quote_text: String,
    pub quote_ref: Option<String>,
    pub status: DeliveryStatus,
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DueBatchResult {
    pub scanned: usize,
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
}
