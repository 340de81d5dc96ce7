//! Subscriber Bot Library
//!
//! A Telegram bot that keeps a list of subscribers and lets administrators
//! broadcast announcements to all of them.
//!
//! This crate provides the core functionality for:
//! - Receiving updates from the Telegram Bot API as inbound events
//! - Routing commands and inline button presses to handlers
//! - Persisting subscribers in SQLite
//! - Fanning a broadcast out to every subscriber
//! - Shutting down cleanly on termination signals

pub mod broadcast;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod shutdown;
pub mod store;
pub mod telegram;

#[cfg(test)]
mod testing;
