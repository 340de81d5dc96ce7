//! Inbound events and outbound responses exchanged with the gateway.

use std::fmt;

/// Identity of the user that triggered an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    /// Platform user id.
    pub id: i64,

    /// Public handle, if any.
    pub username: Option<String>,

    /// First name.
    pub first_name: String,
}

impl Sender {
    /// Creates a sender.
    #[must_use]
    pub fn new(id: i64, username: Option<&str>, first_name: impl Into<String>) -> Self {
        Self {
            id,
            username: username.map(str::to_owned),
            first_name: first_name.into(),
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.username {
            Some(username) => write!(f, "@{username}"),
            None => write!(f, "{} ({})", self.first_name, self.id),
        }
    }
}

/// A plain text message, possibly a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub sender: Sender,
    pub chat_id: i64,
    pub text: String,
}

/// Kind of file attached to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Photo,
    Document,
}

impl AttachmentKind {
    /// Returns a lowercase name for logging.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Document => "document",
        }
    }
}

/// A message carrying a photo or a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentEvent {
    pub sender: Sender,
    pub chat_id: i64,
    pub kind: AttachmentKind,

    /// Platform file reference; for photos, the largest size.
    pub file_ref: String,

    pub caption: Option<String>,
}

/// An inline button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackEvent {
    pub sender: Sender,

    /// Chat of the message that carried the button, or the sender's private
    /// chat when that message is no longer accessible.
    pub chat_id: i64,

    /// Token that must be passed back to acknowledge the press.
    pub callback_id: String,

    /// Opaque payload attached to the button.
    pub payload: String,
}

/// Everything the dispatch loop can receive from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Message(MessageEvent),
    Attachment(AttachmentEvent),
    Callback(CallbackEvent),
}

impl InboundEvent {
    /// Returns the user that triggered the event.
    #[must_use]
    pub const fn sender(&self) -> &Sender {
        match self {
            Self::Message(event) => &event.sender,
            Self::Attachment(event) => &event.sender,
            Self::Callback(event) => &event.sender,
        }
    }

    /// Returns the chat a reply to this event goes to.
    #[must_use]
    pub const fn chat_id(&self) -> i64 {
        match self {
            Self::Message(event) => event.chat_id,
            Self::Attachment(event) => event.chat_id,
            Self::Callback(event) => event.chat_id,
        }
    }

    /// Returns the text to log for this event.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Message(event) => &event.text,
            Self::Attachment(event) => event.caption.as_deref().unwrap_or(event.kind.name()),
            Self::Callback(event) => &event.payload,
        }
    }
}

/// A single selectable inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineOption {
    /// Button label shown to the user.
    pub label: String,

    /// Payload delivered back in a [`CallbackEvent`] when pressed.
    pub payload: String,
}

impl InlineOption {
    #[must_use]
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// A message to send to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundResponse {
    pub chat_id: i64,
    pub text: String,

    /// Inline buttons, one inner vector per row.
    pub options: Option<Vec<Vec<InlineOption>>>,
}

impl OutboundResponse {
    /// Creates a plain text response.
    #[must_use]
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            options: None,
        }
    }

    /// Attaches inline buttons, one per row.
    #[must_use]
    pub fn with_options(mut self, options: impl IntoIterator<Item = InlineOption>) -> Self {
        self.options = Some(options.into_iter().map(|option| vec![option]).collect());
        self
    }
}
