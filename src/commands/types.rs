//! Command types and definitions.

use std::fmt;

/// Static description of a command for help text and client autocomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInfo {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
    pub admin_only: bool,
}

const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "start",
        usage: "/start",
        description: "start interacting with the bot",
        admin_only: false,
    },
    CommandInfo {
        name: "help",
        usage: "/help",
        description: "show this list of commands",
        admin_only: false,
    },
    CommandInfo {
        name: "about",
        usage: "/about",
        description: "bot version, author and contact",
        admin_only: false,
    },
    CommandInfo {
        name: "stats",
        usage: "/stats",
        description: "show bot statistics",
        admin_only: true,
    },
    CommandInfo {
        name: "broadcast",
        usage: "/broadcast <text>",
        description: "send a message to every subscriber",
        admin_only: true,
    },
];

/// Commands understood by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Register as a subscriber and show the menu.
    Start,

    /// Show the command list.
    Help,

    /// Show version and author.
    About,

    /// Show the subscriber count (administrators only).
    Stats,

    /// Send the text to every subscriber (administrators only).
    /// The text may be empty; the handler rejects that.
    Broadcast(String),

    /// A command-shaped message with an unknown name.
    Unknown(String),
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// Accepts `/name`, `/name@botname` and `/name args...`; the name is
    /// case-insensitive. Returns `None` if the text is not command-shaped.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let after_slash = text.strip_prefix('/')?;

        let (token, args) = match after_slash.split_once(char::is_whitespace) {
            Some((token, args)) => (token, args.trim()),
            None => (after_slash, ""),
        };

        // Commands in groups may be addressed as /name@botname.
        let name = token
            .split_once('@')
            .map_or(token, |(name, _)| name)
            .to_lowercase();

        if name.is_empty() {
            return None;
        }

        Some(match name.as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "about" => Self::About,
            "stats" => Self::Stats,
            "broadcast" => Self::Broadcast(args.to_owned()),
            _ => Self::Unknown(name),
        })
    }

    /// Returns the command name as it appears in help.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::About => "about",
            Self::Stats => "stats",
            Self::Broadcast(_) => "broadcast",
            Self::Unknown(name) => name,
        }
    }

    /// Returns every known command in help order.
    #[must_use]
    pub const fn all_commands() -> &'static [CommandInfo] {
        COMMANDS
    }

    /// Returns the commands anyone may use, as `(name, description)` pairs
    /// for client autocomplete.
    #[must_use]
    pub fn public_commands() -> Vec<(&'static str, &'static str)> {
        COMMANDS
            .iter()
            .filter(|info| !info.admin_only)
            .map(|info| (info.name, info.description))
            .collect()
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Broadcast(text) if !text.is_empty() => write!(f, "/broadcast {text}"),
            _ => write!(f, "/{}", self.name()),
        }
    }
}

/// Actions attached to inline buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Help,
    About,
    Unknown(String),
}

impl CallbackAction {
    /// Payload of the "Help" menu button.
    pub const HELP_PAYLOAD: &'static str = "help";

    /// Payload of the "About" menu button.
    pub const ABOUT_PAYLOAD: &'static str = "about";

    /// Parses a callback payload. Never fails; unknown payloads are kept.
    #[must_use]
    pub fn parse(payload: &str) -> Self {
        match payload {
            Self::HELP_PAYLOAD => Self::Help,
            Self::ABOUT_PAYLOAD => Self::About,
            other => Self::Unknown(other.to_owned()),
        }
    }
}
