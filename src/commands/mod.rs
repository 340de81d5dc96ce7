//! Command handling module.
//!
//! Parses slash commands and inline button payloads and produces the reply
//! for each.

mod handler;
pub mod replies;
mod types;

pub use handler::CommandRouter;
pub use types::{BotCommand, CallbackAction, CommandInfo};
