//! User-facing reply texts.

use super::types::BotCommand;

pub const MENU_PROMPT: &str = "Choose an action";
pub const MENU_HELP_LABEL: &str = "Help";
pub const MENU_ABOUT_LABEL: &str = "About";

pub const CALLBACK_HELP: &str = "Use the /start and /about commands.";
pub const CALLBACK_UNKNOWN: &str = "Unknown button.";

pub const NOT_ALLOWED: &str = "You do not have permission to use this command.";
pub const BROADCAST_USAGE: &str = "Specify the broadcast text: /broadcast Hello everyone!";
pub const UNKNOWN_COMMAND: &str =
    "I don't know that command. Send /help to see the available commands.";

pub const START_FAILED: &str = "Could not register you right now, please try again later.";
pub const STATS_FAILED: &str = "Could not load statistics right now.";
pub const BROADCAST_FAILED: &str = "Could not load subscribers, broadcast aborted.";

pub const PHOTO_FAILED: &str = "Could not process the photo.";
pub const DOCUMENT_FAILED: &str = "Could not load the file.";

const ECHO_PREFIX: &str = "You wrote: ";

/// Echo reply for plain text.
pub fn echo(text: &str) -> String {
    format!("{ECHO_PREFIX}{text}")
}

/// Command list generated from the command table.
pub fn help() -> String {
    let mut lines = vec!["Available commands:".to_owned()];
    for info in BotCommand::all_commands() {
        let admin = if info.admin_only { " (admins)" } else { "" };
        lines.push(format!("{} - {}{admin}", info.usage, info.description));
    }
    lines.join("\n")
}

/// Version and author information from the package metadata.
pub fn about() -> String {
    format!(
        "Subscriber Bot v{}\nAuthor: {}\nRepository: {}",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_AUTHORS"),
        env!("CARGO_PKG_REPOSITORY"),
    )
}

pub fn stats(count: u64) -> String {
    format!("Total subscribers: {count}")
}

pub fn broadcast_complete(delivered: usize, attempted: usize, failed: usize) -> String {
    let summary =
        format!("Broadcast complete: delivered to {delivered} of {attempted} subscribers.");
    if failed == 0 {
        summary
    } else {
        format!("{summary} ({failed} failed)")
    }
}

pub fn photo_saved(url: &str) -> String {
    format!("Photo saved! Here is the link: {url}")
}

pub fn document_received(url: &str) -> String {
    format!("Document received! Here is the link: {url}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_lists_every_command() {
        let text = help();
        for info in BotCommand::all_commands() {
            assert!(text.contains(info.usage), "missing {}", info.usage);
        }
        assert!(text.contains("/stats - show bot statistics (admins)"));
    }

    #[test]
    fn test_broadcast_complete() {
        assert_eq!(
            broadcast_complete(3, 3, 0),
            "Broadcast complete: delivered to 3 of 3 subscribers."
        );
        assert_eq!(
            broadcast_complete(1, 3, 2),
            "Broadcast complete: delivered to 1 of 3 subscribers. (2 failed)"
        );
    }
}
