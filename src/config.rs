//! Configuration loader and validator for the quote board service.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub server: Server,
    pub sources: Sources,
    pub board: Board,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    /// Seconds between in-process batch runs; 0 leaves scheduling to an external cron.
    #[serde(default)]
    pub tick_interval_secs: u64,
}

/// Inbound HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub bind: String,
    /// Shared secret expected in `x-cron-secret`. Blank means setup is incomplete.
    #[serde(default)]
    pub cron_secret: String,
}

/// Outbound quote sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sources {
    pub script_site_url: String,
    pub json_quotes_url: String,
    pub user_agent: String,
}

/// Board write endpoint and delivery policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Board {
    pub endpoint: String,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub max_chars: usize,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    pub fn default_database_url(&self) -> String {
        format!(
            "sqlite://{}/quoteboard.db",
            self.app.data_dir.trim_end_matches('/')
        )
    }

    /// Names of settings that must be filled in before the cron trigger accepts requests.
    pub fn missing_cron_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.server.cron_secret.trim().is_empty() {
            missing.push("server.cron_secret");
        }
        missing
    }

    pub fn cron_secret(&self) -> Option<String> {
        let secret = self.server.cron_secret.trim();
        (!secret.is_empty()).then(|| secret.to_string())
    }

    pub fn tick_interval(&self) -> Option<Duration> {
        (self.app.tick_interval_secs > 0).then(|| Duration::from_secs(self.app.tick_interval_secs))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }

    if cfg.server.bind.parse::<SocketAddr>().is_err() {
        return Err(ConfigError::Invalid("server.bind must be a socket address"));
    }

    if Url::parse(&cfg.sources.script_site_url).is_err() {
        return Err(ConfigError::Invalid("sources.script_site_url must be a valid URL"));
    }
    if Url::parse(&cfg.sources.json_quotes_url).is_err() {
        return Err(ConfigError::Invalid("sources.json_quotes_url must be a valid URL"));
    }
    if cfg.sources.user_agent.trim().is_empty() {
        return Err(ConfigError::Invalid("sources.user_agent must be non-empty"));
    }

    if Url::parse(&cfg.board.endpoint).is_err() {
        return Err(ConfigError::Invalid("board.endpoint must be a valid URL"));
    }
    if cfg.board.max_attempts == 0 {
        return Err(ConfigError::Invalid("board.max_attempts must be > 0"));
    }
    if cfg.board.max_chars == 0 {
        return Err(ConfigError::Invalid("board.max_chars must be > 0"));
    }

    Ok(())
}

/// Returns the sample YAML configuration.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  tick_interval_secs: 0

server:
  bind: "127.0.0.1:8080"
  cron_secret: "CHANGE_ME"

sources:
  script_site_url: "https://www.dailyscript.com/"
  json_quotes_url: "https://raw.githubusercontent.com/AndrewReitz/rick-and-morty-quotes-json/master/rick-and-morty-quotes.json"
  user_agent: "Mozilla/5.0 QuoteboardBot/1.0"

board:
  endpoint: "https://rw.vestaboard.com/"
  max_attempts: 3
  backoff_base_ms: 400
  max_chars: 132
"#
}
