//! Telegram gateway module.
//!
//! Converts Bot API updates into [`InboundEvent`]s and exposes the outbound
//! calls (send, callback acknowledgement, file links) behind [`Gateway`].

mod client;
mod events;
mod gateway;

pub use client::TelegramGateway;
pub use events::{
    AttachmentEvent, AttachmentKind, CallbackEvent, InboundEvent, InlineOption, MessageEvent,
    OutboundResponse, Sender,
};
pub use gateway::{Gateway, GatewayError};
