//! Configuration module for the subscriber bot.
//!
//! Handles loading of Telegram credentials, storage and broadcast settings,
//! and the administrator list.

mod admins;
mod settings;

pub use admins::{AdminList, AdminsError, AdminsFile, AuthorizationPolicy};
pub use settings::{BotSettings, ConfigError, TelegramConfig};
