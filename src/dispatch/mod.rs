//! Event dispatch module.
//!
//! The bot's single long-running loop: takes events from the gateway in
//! order and hands each to the right handler until shutdown.

mod runner;

pub use runner::{Dispatcher, StopReason};
