//! Application settings and Telegram configuration.

use std::fmt;
use std::path::PathBuf;

use secrecy::SecretString;

/// Telegram Bot API configuration.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token issued by @BotFather.
    pub token: SecretString,

    /// Long-polling timeout for `getUpdates` in seconds.
    pub poll_timeout_secs: u32,
}

fn default_poll_timeout() -> u32 {
    30
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token: SecretString::new(token),
            poll_timeout_secs: default_poll_timeout(),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `TELEGRAM_BOT_TOKEN` to be set.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is missing or the timeout is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is missing or the timeout is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN"))?;

        let poll_timeout_secs = match lookup("TELEGRAM_POLL_TIMEOUT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("TELEGRAM_POLL_TIMEOUT", raw))?,
            None => default_poll_timeout(),
        };

        Ok(Self {
            token: SecretString::new(token.trim().to_owned()),
            poll_timeout_secs,
        })
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

/// Bot-specific settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotSettings {
    /// sqlx connection URL of the subscriber database.
    pub database_url: String,

    /// Path to the administrators JSON file.
    pub admins_path: PathBuf,

    /// Administrator ids supplied through the environment.
    pub admin_ids: Vec<i64>,

    /// Maximum number of broadcast sends in flight at once.
    pub broadcast_workers: usize,
}

fn default_database_url() -> String {
    "sqlite:bot.db".to_owned()
}

fn default_admins_path() -> PathBuf {
    PathBuf::from("admins.json")
}

fn default_broadcast_workers() -> usize {
    1 // strictly sequential, in subscriber order
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            admins_path: default_admins_path(),
            admin_ids: Vec::new(),
            broadcast_workers: default_broadcast_workers(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates bot settings from an arbitrary variable lookup.
    ///
    /// Unparseable values fall back to their defaults; unparseable admin ids
    /// are skipped.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(default_database_url),
            admins_path: lookup("ADMINS_PATH").map_or_else(default_admins_path, PathBuf::from),
            admin_ids: lookup("ADMIN_IDS")
                .map(|raw| parse_id_list(&raw))
                .unwrap_or_default(),
            broadcast_workers: lookup("BROADCAST_WORKERS")
                .and_then(|s| s.trim().parse().ok())
                .filter(|&workers: &usize| workers > 0)
                .unwrap_or_else(default_broadcast_workers),
        }
    }
}

/// Parses a comma-separated list of numeric ids, skipping invalid entries.
fn parse_id_list(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            part.parse()
                .inspect_err(|_| tracing::warn!("Ignoring invalid admin id: {}", part))
                .ok()
        })
        .collect()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid value for {0}: {1:?} (must be a non-negative integer)")]
    InvalidNumber(&'static str, String),
}
