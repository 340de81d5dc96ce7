//! Command handler implementation.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::replies;
use super::types::{BotCommand, CallbackAction};
use crate::broadcast::Broadcaster;
use crate::config::AuthorizationPolicy;
use crate::store::{Subscriber, SubscriberStore};
use crate::telegram::{InlineOption, MessageEvent, OutboundResponse, Sender};

/// Maps messages and button presses to replies.
///
/// Handlers never retry and never fail: store and gateway errors are logged
/// and turned into a reply for the triggering chat.
pub struct CommandRouter {
    /// Subscriber storage.
    store: Arc<dyn SubscriberStore>,

    /// Who may run `/stats` and `/broadcast`.
    admins: Arc<dyn AuthorizationPolicy>,

    /// Fan-out used by `/broadcast`.
    broadcaster: Broadcaster,
}

impl CommandRouter {
    /// Creates a new command router.
    #[must_use]
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        admins: Arc<dyn AuthorizationPolicy>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            store,
            admins,
            broadcaster,
        }
    }

    /// Produces the reply to a text message.
    ///
    /// Plain text is echoed back; command-shaped text is routed to its
    /// handler.
    pub async fn route(&self, message: &MessageEvent) -> OutboundResponse {
        let chat_id = message.chat_id;

        let Some(command) = BotCommand::parse(&message.text) else {
            return OutboundResponse::text(chat_id, replies::echo(&message.text));
        };

        debug!("Handling command: {}", command);
        let response = self.execute(command, &message.sender, chat_id).await;
        info!(chat_id, "Command handled");

        response
    }

    /// Resolves a button payload to reply text.
    #[must_use]
    pub fn resolve_callback(&self, payload: &str) -> String {
        match CallbackAction::parse(payload) {
            CallbackAction::Help => replies::CALLBACK_HELP.to_owned(),
            CallbackAction::About => replies::about(),
            CallbackAction::Unknown(payload) => {
                debug!("Unknown callback payload: {:?}", payload);
                replies::CALLBACK_UNKNOWN.to_owned()
            }
        }
    }

    /// Executes a parsed command.
    async fn execute(
        &self,
        command: BotCommand,
        sender: &Sender,
        chat_id: i64,
    ) -> OutboundResponse {
        match command {
            BotCommand::Start => self.handle_start(sender, chat_id).await,
            BotCommand::Help => OutboundResponse::text(chat_id, replies::help()),
            BotCommand::About => OutboundResponse::text(chat_id, replies::about()),
            BotCommand::Stats => self.handle_stats(sender, chat_id).await,
            BotCommand::Broadcast(text) => self.handle_broadcast(sender, chat_id, &text).await,
            BotCommand::Unknown(_) => OutboundResponse::text(chat_id, replies::UNKNOWN_COMMAND),
        }
    }

    async fn handle_start(&self, sender: &Sender, chat_id: i64) -> OutboundResponse {
        let subscriber = Subscriber::new(
            sender.id,
            sender.username.clone(),
            sender.first_name.clone(),
            Utc::now(),
        );

        if let Err(e) = self.store.upsert(&subscriber).await {
            warn!(subscriber_id = sender.id, error = %e, "Failed to save subscriber");
            return OutboundResponse::text(chat_id, replies::START_FAILED);
        }

        info!(subscriber_id = sender.id, "Subscriber registered");
        OutboundResponse::text(chat_id, replies::MENU_PROMPT).with_options([
            InlineOption::new(replies::MENU_HELP_LABEL, CallbackAction::HELP_PAYLOAD),
            InlineOption::new(replies::MENU_ABOUT_LABEL, CallbackAction::ABOUT_PAYLOAD),
        ])
    }

    async fn handle_stats(&self, sender: &Sender, chat_id: i64) -> OutboundResponse {
        if !self.is_admin(sender, "stats") {
            return OutboundResponse::text(chat_id, replies::NOT_ALLOWED);
        }

        match self.store.count().await {
            Ok(count) => OutboundResponse::text(chat_id, replies::stats(count)),
            Err(e) => {
                warn!(error = %e, "Failed to count subscribers");
                OutboundResponse::text(chat_id, replies::STATS_FAILED)
            }
        }
    }

    async fn handle_broadcast(
        &self,
        sender: &Sender,
        chat_id: i64,
        text: &str,
    ) -> OutboundResponse {
        if !self.is_admin(sender, "broadcast") {
            return OutboundResponse::text(chat_id, replies::NOT_ALLOWED);
        }

        if text.is_empty() {
            return OutboundResponse::text(chat_id, replies::BROADCAST_USAGE);
        }

        match self.broadcaster.fan_out(text).await {
            Ok(report) => OutboundResponse::text(
                chat_id,
                replies::broadcast_complete(
                    report.delivered,
                    report.attempted,
                    report.failed_count(),
                ),
            ),
            Err(e) => {
                warn!(error = %e, "Failed to load subscribers for broadcast");
                OutboundResponse::text(chat_id, replies::BROADCAST_FAILED)
            }
        }
    }

    fn is_admin(&self, sender: &Sender, command: &str) -> bool {
        let allowed = self.admins.is_admin(sender.id);
        if !allowed {
            warn!(sender = sender.id, command, "Privileged command refused");
        }
        allowed
    }
}

impl std::fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRouter")
            .field("broadcaster", &self.broadcaster)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdminList;
    use crate::testing::{MemoryStore, RecordingGateway};

    const ADMIN: i64 = 1;
    const USER: i64 = 2;

    struct Fixture {
        router: CommandRouter,
        store: Arc<MemoryStore>,
        gateway: Arc<RecordingGateway>,
    }

    fn fixture(store: MemoryStore) -> Fixture {
        let store = Arc::new(store);
        let gateway = Arc::new(RecordingGateway::new());
        let broadcaster = Broadcaster::new(store.clone(), gateway.clone());
        let router = CommandRouter::new(
            store.clone(),
            Arc::new(AdminList::from_ids([ADMIN])),
            broadcaster,
        );
        Fixture {
            router,
            store,
            gateway,
        }
    }

    fn message(sender_id: i64, text: &str) -> MessageEvent {
        MessageEvent {
            sender: Sender::new(sender_id, Some("tester"), "Test"),
            chat_id: sender_id + 100,
            text: text.to_owned(),
        }
    }

    async fn reply(fixture: &Fixture, sender_id: i64, text: &str) -> OutboundResponse {
        fixture.router.route(&message(sender_id, text)).await
    }

    #[tokio::test]
    async fn test_echo_plain_text() {
        let f = fixture(MemoryStore::new());
        let response = reply(&f, USER, "xyz").await;
        assert_eq!(response, OutboundResponse::text(USER + 100, "You wrote: xyz"));
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let f = fixture(MemoryStore::new());
        assert_eq!(reply(&f, USER, "/dance").await.text, replies::UNKNOWN_COMMAND);
    }

    #[tokio::test]
    async fn test_help_and_about_same_for_everyone() {
        let f = fixture(MemoryStore::new());

        let help_admin = reply(&f, ADMIN, "/help").await.text;
        let help_user = reply(&f, USER, "/help").await.text;
        let help_other = reply(&f, 999, "/help").await.text;
        assert_eq!(help_admin, help_user);
        assert_eq!(help_user, help_other);

        let about_admin = reply(&f, ADMIN, "/about").await.text;
        let about_user = reply(&f, USER, "/about").await.text;
        assert_eq!(about_admin, about_user);
        assert!(about_user.contains(env!("CARGO_PKG_VERSION")));

        assert_eq!(f.store.reads(), 0);
        assert!(f.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_start_registers_and_shows_menu() {
        let f = fixture(MemoryStore::new());

        let response = reply(&f, USER, "/start").await;

        assert_eq!(response.text, replies::MENU_PROMPT);
        let options = response.options.unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0][0].payload, "help");
        assert_eq!(options[1][0].payload, "about");

        let subscribers = f.store.snapshot();
        assert_eq!(subscribers.len(), 1);
        assert_eq!(subscribers[0].id, USER);
        assert_eq!(subscribers[0].username.as_deref(), Some("tester"));
    }

    #[tokio::test]
    async fn test_start_twice_keeps_one_record() {
        let f = fixture(MemoryStore::new());

        reply(&f, USER, "/start").await;
        let first_created = f.store.snapshot()[0].created_at;

        let mut renamed = message(USER, "/start");
        renamed.sender.first_name = "Renamed".to_owned();
        f.router.route(&renamed).await;

        let subscribers = f.store.snapshot();
        assert_eq!(subscribers.len(), 1);
        assert_eq!(subscribers[0].first_name, "Renamed");
        assert_eq!(subscribers[0].created_at, first_created);
    }

    #[tokio::test]
    async fn test_start_store_failure_still_replies() {
        let f = fixture(MemoryStore::failing());
        assert_eq!(reply(&f, USER, "/start").await.text, replies::START_FAILED);
    }

    #[tokio::test]
    async fn test_non_admin_refused_without_store_read_or_send() {
        let f = fixture(MemoryStore::with_subscribers([10, 11]));

        assert_eq!(reply(&f, USER, "/stats").await.text, replies::NOT_ALLOWED);
        assert_eq!(
            reply(&f, USER, "/broadcast hello").await.text,
            replies::NOT_ALLOWED
        );
        assert_eq!(reply(&f, USER, "/broadcast").await.text, replies::NOT_ALLOWED);

        assert_eq!(f.store.reads(), 0);
        assert!(f.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_admin_stats() {
        let f = fixture(MemoryStore::with_subscribers([10, 11, 12]));
        assert_eq!(reply(&f, ADMIN, "/stats").await.text, "Total subscribers: 3");
    }

    #[tokio::test]
    async fn test_admin_stats_store_failure() {
        let f = fixture(MemoryStore::failing());
        assert_eq!(reply(&f, ADMIN, "/stats").await.text, replies::STATS_FAILED);
    }

    #[tokio::test]
    async fn test_broadcast_requires_text() {
        let f = fixture(MemoryStore::with_subscribers([10]));

        assert_eq!(
            reply(&f, ADMIN, "/broadcast   ").await.text,
            replies::BROADCAST_USAGE
        );
        assert_eq!(f.store.reads(), 0);
        assert!(f.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_admin_broadcast_reaches_every_subscriber() {
        let f = fixture(MemoryStore::with_subscribers([10, 11, 12]));

        let response = reply(&f, ADMIN, "/broadcast hi").await;

        assert_eq!(response.chat_id, ADMIN + 100);
        assert_eq!(
            response.text,
            "Broadcast complete: delivered to 3 of 3 subscribers."
        );
        let chats: Vec<i64> = f.gateway.sent().iter().map(|r| r.chat_id).collect();
        assert_eq!(chats, vec![10, 11, 12]);
    }

    #[tokio::test]
    async fn test_broadcast_store_failure() {
        let f = fixture(MemoryStore::failing());
        assert_eq!(
            reply(&f, ADMIN, "/broadcast hi").await.text,
            replies::BROADCAST_FAILED
        );
    }

    #[test]
    fn test_resolve_callback() {
        let f = fixture(MemoryStore::new());
        assert_eq!(f.router.resolve_callback("help"), replies::CALLBACK_HELP);
        assert_eq!(f.router.resolve_callback("about"), replies::about());
        assert_eq!(f.router.resolve_callback("nope"), replies::CALLBACK_UNKNOWN);
    }
}
