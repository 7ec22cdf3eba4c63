//! Board settings as submitted by the operator, validated before they reach the store.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::QuoteMode;

pub const DEFAULT_BOARD_NAME: &str = "My Board";
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";
pub const DEFAULT_INTERVAL_MINUTES: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid settings payload: {}", .issues.join("; "))]
pub struct ValidationError {
    pub issues: Vec<String>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("A board API key is required for initial setup.")]
    MissingApiKey,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

fn default_board_name() -> String {
    DEFAULT_BOARD_NAME.to_string()
}

fn default_mode() -> QuoteMode {
    QuoteMode::DailyScript
}

fn default_interval() -> i64 {
    DEFAULT_INTERVAL_MINUTES
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_active() -> bool {
    true
}

/// Raw settings payload; missing fields take their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsInput {
    #[serde(default = "default_board_name")]
    pub board_name: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default = "default_mode")]
    pub mode: QuoteMode,
    #[serde(default = "default_interval")]
    pub interval_minutes: i64,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Default for SettingsInput {
    fn default() -> Self {
        Self {
            board_name: default_board_name(),
            api_key: None,
            api_secret: None,
            mode: default_mode(),
            interval_minutes: default_interval(),
            timezone: default_timezone(),
            active: default_active(),
        }
    }
}

/// Settings that passed validation. Absent credentials leave the stored ones untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub board_name: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub mode: QuoteMode,
    pub interval_minutes: i64,
    pub timezone: String,
    pub active: bool,
}

impl std::fmt::Debug for SettingsUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsUpdate")
            .field("board_name", &self.board_name)
            .field("has_api_key", &self.api_key.is_some())
            .field("has_api_secret", &self.api_secret.is_some())
            .field("mode", &self.mode)
            .field("interval_minutes", &self.interval_minutes)
            .field("timezone", &self.timezone)
            .field("active", &self.active)
            .finish()
    }
}

/// What the dashboard may see of the stored settings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicSettings {
    pub board_name: String,
    pub mode: QuoteMode,
    pub interval_minutes: i64,
    pub timezone: String,
    pub active: bool,
    pub has_api_secret: bool,
    pub api_key_masked: String,
}

fn credential_field(
    name: &str,
    value: Option<&str>,
    issues: &mut Vec<String>,
) -> Option<String> {
    let trimmed = value.map(str::trim).filter(|v| !v.is_empty())?;
    let len = trimmed.chars().count();
    if !(8..=256).contains(&len) {
        issues.push(format!("{name} must be between 8 and 256 characters"));
    }
    Some(trimmed.to_string())
}

impl SettingsInput {
    pub fn validate(&self) -> Result<SettingsUpdate, ValidationError> {
        let mut issues = Vec::new();

        let board_name = self.board_name.trim().to_string();
        let name_len = board_name.chars().count();
        if !(1..=80).contains(&name_len) {
            issues.push("boardName must be between 1 and 80 characters".to_string());
        }

        let api_key = credential_field("apiKey", self.api_key.as_deref(), &mut issues);
        let api_secret = credential_field("apiSecret", self.api_secret.as_deref(), &mut issues);

        if !(1..=1440).contains(&self.interval_minutes) {
            issues.push("intervalMinutes must be between 1 and 1440".to_string());
        }

        let timezone = self.timezone.trim().to_string();
        if !(3..=100).contains(&timezone.chars().count()) {
            issues.push("timezone must be between 3 and 100 characters".to_string());
        }

        if !issues.is_empty() {
            return Err(ValidationError { issues });
        }

        Ok(SettingsUpdate {
            board_name,
            api_key,
            api_secret,
            mode: self.mode,
            interval_minutes: self.interval_minutes,
            timezone,
            active: self.active,
        })
    }
}

/// `abc*****yz`; short values are masked entirely.
pub fn mask_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();
    if len <= 6 {
        return "*".repeat(len);
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[len - 2..].iter().collect();
    format!("{head}{}{tail}", "*".repeat((len - 5).max(3)))
}
