//! Update dispatching
//!
//! Wires the three update branches (commands, callback queries, free text)
//! into a teloxide `Dispatcher`. All handlers share one [`AppContext`],
//! constructed once in `main` and injected through dptree dependencies; no
//! handler reaches for globals.

use crate::config::Config;
use crate::database::Database;
use crate::locales::Translator;
use crate::logger::{self, LogTag};
use crate::state::ConversationStore;
use crate::telegram::commands::{self, Command};
use std::sync::Arc;
use teloxide::prelude::*;

/// Shared application state passed to every handler
pub struct AppContext {
    pub cfg: Config,
    pub db: Database,
    pub translator: Translator,
    pub conversations: ConversationStore,
}

impl AppContext {
    /// Display language of a user: stored language when registered,
    /// otherwise the configured default locale.
    pub fn lang(&self, user_id: i64) -> String {
        self.db
            .get_language(user_id)
            .unwrap_or_else(|e| {
                logger::warning(
                    LogTag::Database,
                    &format!("Failed to read language for {}: {}", user_id, e),
                );
                None
            })
            .unwrap_or_else(|| self.cfg.general.default_locale.clone())
    }
}

/// Run the long-polling dispatcher until shutdown
pub async fn run_dispatcher(bot: Bot, ctx: Arc<AppContext>) {
    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(commands::handle_command),
        )
        .branch(Update::filter_callback_query().endpoint(commands::callbacks::handle_callback))
        .branch(Update::filter_message().endpoint(commands::messages::handle_message));

    logger::info(LogTag::Telegram, "Dispatcher started, polling for updates");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
