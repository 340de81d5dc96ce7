//! Event dispatch loop.
//!
//! The loop follows a simple state machine:
//! 1. Wait for either the shutdown token or the next inbound event
//!    (shutdown wins when both are ready)
//! 2. On shutdown → log and return
//! 3. On an event:
//!    - message → command router → send reply
//!    - attachment → resolve link → send acknowledgement
//!    - callback → acknowledge → resolve payload → send reply
//! 4. Go back to 1
//!
//! Cancellation is only observed between events: an event that has started
//! processing always runs to completion.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

use crate::commands::{CommandRouter, replies};
use crate::telegram::{
    AttachmentEvent, AttachmentKind, CallbackEvent, Gateway, InboundEvent, MessageEvent,
    OutboundResponse,
};

/// Why the dispatch loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown token fired.
    Shutdown,
    /// The gateway closed the event stream.
    StreamClosed,
}

/// Pulls inbound events and answers them one at a time.
pub struct Dispatcher {
    /// Outbound side of the gateway.
    gateway: Arc<dyn Gateway>,

    /// Command handling.
    router: CommandRouter,
}

impl Dispatcher {
    /// Creates a new dispatcher.
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>, router: CommandRouter) -> Self {
        Self { gateway, router }
    }

    /// Runs the dispatch loop until `shutdown` fires or `events` closes.
    ///
    /// Events are processed strictly in arrival order.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<InboundEvent>,
        shutdown: CancellationToken,
    ) -> StopReason {
        info!("Dispatch loop started");

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    info!("Shutdown requested, dispatch loop stopping");
                    return StopReason::Shutdown;
                }
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event).await,
                    None => {
                        warn!("Event stream closed, dispatch loop stopping");
                        return StopReason::StreamClosed;
                    }
                },
            }
        }
    }

    /// Handles a single event inside its own span.
    async fn dispatch(&self, event: InboundEvent) {
        let span = info_span!(
            "event",
            sender = event.sender().id,
            chat_id = event.chat_id()
        );

        async move {
            info!("[{}] {}", event.sender(), event.text());

            match event {
                InboundEvent::Message(message) => self.handle_message(&message).await,
                InboundEvent::Attachment(attachment) => {
                    self.handle_attachment(&attachment).await;
                }
                InboundEvent::Callback(callback) => self.handle_callback(&callback).await,
            }
        }
        .instrument(span)
        .await;
    }

    async fn handle_message(&self, message: &MessageEvent) {
        let response = self.router.route(message).await;
        self.deliver(&response).await;
    }

    async fn handle_attachment(&self, attachment: &AttachmentEvent) {
        let kind = attachment.kind;

        let text = match self
            .gateway
            .resolve_attachment_link(&attachment.file_ref)
            .await
        {
            Ok(url) => match kind {
                AttachmentKind::Photo => replies::photo_saved(&url),
                AttachmentKind::Document => replies::document_received(&url),
            },
            Err(e) => {
                warn!(kind = kind.name(), error = %e, "Failed to resolve attachment link");
                match kind {
                    AttachmentKind::Photo => replies::PHOTO_FAILED.to_owned(),
                    AttachmentKind::Document => replies::DOCUMENT_FAILED.to_owned(),
                }
            }
        };

        self.deliver(&OutboundResponse::text(attachment.chat_id, text))
            .await;
    }

    async fn handle_callback(&self, callback: &CallbackEvent) {
        // Telegram keeps the button spinning until the press is acknowledged.
        if let Err(e) = self.gateway.acknowledge(&callback.callback_id).await {
            warn!(error = %e, "Failed to acknowledge callback");
        }

        let text = self.router.resolve_callback(&callback.payload);
        self.deliver(&OutboundResponse::text(callback.chat_id, text))
            .await;
    }

    /// Sends a reply, logging failures.
    async fn deliver(&self, response: &OutboundResponse) {
        if let Err(e) = self.gateway.send(response).await {
            warn!(chat_id = response.chat_id, error = %e, "Failed to send reply");
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}
