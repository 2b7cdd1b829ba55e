//! Best-effort notification delivery
//!
//! All sends here happen after the ledger mutation they describe has
//! committed. A failed delivery (bot blocked, network error, bad group id)
//! is logged and swallowed per recipient; it never rolls anything back and
//! never prevents the remaining recipients from being notified.

use crate::config::Config;
use crate::logger::{self, LogTag};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, ParseMode};

/// Send a message to every configured admin group, with an optional inline
/// keyboard. Failures are isolated per group.
pub async fn broadcast_to_admin_groups(
    bot: &Bot,
    cfg: &Config,
    text: &str,
    keyboard: Option<InlineKeyboardMarkup>,
) {
    if cfg.admin_groups.is_empty() {
        logger::warning(
            LogTag::Telegram,
            "No admin groups configured; request will wait unseen",
        );
        return;
    }

    for group in &cfg.admin_groups {
        let request = bot
            .send_message(ChatId(*group), text)
            .parse_mode(ParseMode::Html);
        let request = match &keyboard {
            Some(kb) => request.reply_markup(kb.clone()),
            None => request,
        };
        if let Err(e) = request.await {
            logger::warning(
                LogTag::Telegram,
                &format!("Failed to notify admin group {}: {}", group, e),
            );
        }
    }
}

/// Send a message to a single user, swallowing delivery errors
pub async fn notify_user(bot: &Bot, user_id: i64, text: &str) {
    if let Err(e) = bot
        .send_message(ChatId(user_id), text)
        .parse_mode(ParseMode::Html)
        .await
    {
        logger::warning(
            LogTag::Telegram,
            &format!("Failed to notify user {}: {}", user_id, e),
        );
    }
}

/// Like [`notify_user`] but with an inline keyboard
pub async fn notify_user_with_keyboard(
    bot: &Bot,
    user_id: i64,
    text: &str,
    keyboard: InlineKeyboardMarkup,
) {
    if let Err(e) = bot
        .send_message(ChatId(user_id), text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await
    {
        logger::warning(
            LogTag::Telegram,
            &format!("Failed to notify user {}: {}", user_id, e),
        );
    }
}
