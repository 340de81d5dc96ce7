//! Telegram Bot API client: update polling and outbound calls.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use teloxide::prelude::*;
use teloxide::types::{
    AllowedUpdate, BotCommand as PlatformCommand, InlineKeyboardButton, InlineKeyboardMarkup,
    UpdateKind, User,
};
use teloxide::{ApiError, RequestError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::events::{
    AttachmentEvent, AttachmentKind, CallbackEvent, InboundEvent, InlineOption, MessageEvent,
    OutboundResponse, Sender,
};
use super::gateway::{Gateway, GatewayError};
use crate::config::TelegramConfig;

/// Capacity of the channel between the polling task and the dispatch loop.
const EVENT_BUFFER: usize = 64;

/// Pause before retrying a failed `getUpdates` call.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Extra HTTP timeout on top of the long-polling timeout so the client does
/// not abort a request Telegram is still holding open.
const HTTP_TIMEOUT_MARGIN_SECS: u64 = 15;

/// High-level Telegram Bot API wrapper.
#[derive(Clone)]
pub struct TelegramGateway {
    /// The underlying teloxide bot.
    bot: Bot,

    /// Bot username reported by `getMe`.
    username: Option<String>,

    /// Long-polling timeout in seconds.
    poll_timeout_secs: u32,
}

impl TelegramGateway {
    /// Connects to Telegram, verifies the token and clears any webhook so
    /// long polling works.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or Telegram is unreachable.
    pub async fn connect(config: &TelegramConfig) -> Result<Self, GatewayError> {
        info!("Connecting to Telegram...");

        let client = teloxide::net::default_reqwest_settings()
            .timeout(Duration::from_secs(
                u64::from(config.poll_timeout_secs) + HTTP_TIMEOUT_MARGIN_SECS,
            ))
            .build()
            .map_err(|e| GatewayError::Connection(e.to_string()))?;
        let bot = Bot::with_client(config.token.expose_secret(), client);

        let me = bot.get_me().await?;
        bot.delete_webhook().send().await?;

        info!(username = ?me.username, "Connected to Telegram (webhook cleared)");

        Ok(Self {
            bot,
            username: me.username.clone(),
            poll_timeout_secs: config.poll_timeout_secs,
        })
    }

    /// Returns the bot's username, if it has one.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Registers the command list shown in Telegram clients' autocomplete.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn register_commands(
        &self,
        commands: &[(&'static str, &'static str)],
    ) -> Result<(), GatewayError> {
        let commands: Vec<PlatformCommand> = commands
            .iter()
            .map(|(name, description)| PlatformCommand::new(*name, *description))
            .collect();
        self.bot.set_my_commands(commands).await?;
        Ok(())
    }

    /// Starts long polling in a background task.
    ///
    /// Events arrive on the returned channel in the order Telegram delivered
    /// them. The channel closes when `shutdown` is cancelled, when another
    /// instance takes over polling for this token, or when the receiver is
    /// dropped.
    pub fn spawn_polling(&self, shutdown: CancellationToken) -> mpsc::Receiver<InboundEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let bot = self.bot.clone();
        let timeout = self.poll_timeout_secs;

        tokio::spawn(async move {
            poll_updates(bot, timeout, tx, shutdown).await;
        });

        rx
    }
}

#[async_trait]
impl Gateway for TelegramGateway {
    async fn send(&self, response: &OutboundResponse) -> Result<(), GatewayError> {
        let mut request = self
            .bot
            .send_message(ChatId(response.chat_id), response.text.clone());

        if let Some(rows) = &response.options {
            request = request.reply_markup(inline_keyboard(rows));
        }

        request.await?;
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), GatewayError> {
        self.bot.answer_callback_query(callback_id.to_owned()).await?;
        Ok(())
    }

    async fn resolve_attachment_link(&self, file_ref: &str) -> Result<String, GatewayError> {
        let file = self.bot.get_file(file_ref.to_owned()).await?;
        Ok(file_url(self.bot.token(), &file.path))
    }
}

impl std::fmt::Debug for TelegramGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramGateway")
            .field("username", &self.username)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish_non_exhaustive()
    }
}

/// Long-polling loop feeding the dispatch channel.
async fn poll_updates(
    bot: Bot,
    timeout: u32,
    tx: mpsc::Sender<InboundEvent>,
    shutdown: CancellationToken,
) {
    info!("Update polling started");
    let mut offset: i32 = 0;

    loop {
        let request = bot
            .get_updates()
            .offset(offset)
            .timeout(timeout)
            .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery]);

        let result = tokio::select! {
            () = shutdown.cancelled() => break,
            result = request.send() => result,
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "Received updates");
                for update in updates {
                    offset = update.id.as_offset();

                    let Some(event) = convert_update(update.kind) else {
                        continue;
                    };

                    if tx.send(event).await.is_err() {
                        debug!("Dispatch loop is gone");
                        return;
                    }
                }
            }
            Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                error!("Another bot instance is polling with this token, stopping");
                break;
            }
            Err(e) => {
                warn!(error = %e, "getUpdates failed, retrying in {:?}", RETRY_DELAY);
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(RETRY_DELAY) => {}
                }
            }
        }
    }

    info!("Update polling stopped");
}

/// Converts a raw update into an inbound event, dropping kinds the bot does
/// not handle.
fn convert_update(kind: UpdateKind) -> Option<InboundEvent> {
    match kind {
        UpdateKind::Message(message) => convert_message(&message),
        UpdateKind::CallbackQuery(query) => Some(convert_callback(&query)),
        other => {
            debug!("Ignoring update: {:?}", other);
            None
        }
    }
}

fn convert_message(message: &Message) -> Option<InboundEvent> {
    let Some(from) = message.from.as_ref() else {
        debug!(chat_id = message.chat.id.0, "Ignoring message without a sender");
        return None;
    };
    let sender = sender_from(from);
    let chat_id = message.chat.id.0;
    let caption = message.caption().map(str::to_owned);

    // Last photo size is the largest.
    if let Some(photo) = message.photo().and_then(<[_]>::last) {
        return Some(InboundEvent::Attachment(AttachmentEvent {
            sender,
            chat_id,
            kind: AttachmentKind::Photo,
            file_ref: photo.file.id.to_string(),
            caption,
        }));
    }

    if let Some(document) = message.document() {
        return Some(InboundEvent::Attachment(AttachmentEvent {
            sender,
            chat_id,
            kind: AttachmentKind::Document,
            file_ref: document.file.id.to_string(),
            caption,
        }));
    }

    // Stickers, voice notes, locations and the like still get a reply: they
    // reach the router with their caption or an empty text.
    let text = message.text().or(caption.as_deref()).unwrap_or_default();

    Some(InboundEvent::Message(MessageEvent {
        sender,
        chat_id,
        text: text.to_owned(),
    }))
}

fn convert_callback(query: &CallbackQuery) -> InboundEvent {
    let sender = sender_from(&query.from);
    let chat_id = query
        .message
        .as_ref()
        .map_or(sender.id, |message| message.chat().id.0);

    InboundEvent::Callback(CallbackEvent {
        sender,
        chat_id,
        callback_id: query.id.to_string(),
        payload: query.data.clone().unwrap_or_default(),
    })
}

fn sender_from(user: &User) -> Sender {
    Sender {
        id: i64::try_from(user.id.0).unwrap_or_default(),
        username: user.username.clone(),
        first_name: user.first_name.clone(),
    }
}

fn inline_keyboard(rows: &[Vec<InlineOption>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|option| InlineKeyboardButton::callback(&option.label, &option.payload))
            .collect::<Vec<_>>()
    }))
}

/// Builds the direct download URL for a file path returned by `getFile`.
fn file_url(token: &str, path: &str) -> String {
    format!("https://api.telegram.org/file/bot{token}/{path}")
}
