//! Outbound side of the messaging gateway.

use async_trait::async_trait;
use thiserror::Error;

use super::events::OutboundResponse;

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Bot API request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Send to chat {chat_id} failed: {reason}")]
    Rejected { chat_id: i64, reason: String },
}

/// Outbound calls the dispatch loop and broadcaster make to the platform.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Sends a message to `response.chat_id`.
    async fn send(&self, response: &OutboundResponse) -> Result<(), GatewayError>;

    /// Acknowledges an inline button press so the client stops its spinner.
    async fn acknowledge(&self, callback_id: &str) -> Result<(), GatewayError>;

    /// Resolves a file reference to a direct download URL.
    async fn resolve_attachment_link(&self, file_ref: &str) -> Result<String, GatewayError>;
}
