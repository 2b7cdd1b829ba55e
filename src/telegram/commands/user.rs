//! User-facing commands: /start, /id, /balance, /help

use crate::logger::{self, LogTag};
use crate::state::Conversation;
use crate::telegram::commands::callbacks::send_menu;
use crate::telegram::formatters::format_amount;
use crate::telegram::keyboards;
use crate::telegram::notifier::broadcast_to_admin_groups;
use crate::telegram::AppContext;
use crate::validation::parse_signed_amount;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};

/// /start: main menu for registered users, registration for new ones.
/// A `ref_<id>` payload marks the referrer until registration completes.
pub async fn handle_start(
    bot: &Bot,
    msg: &Message,
    ctx: &Arc<AppContext>,
    payload: &str,
) -> ResponseResult<()> {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user_id = from.id.0 as i64;

    // Re-entering the main menu always abandons any in-progress flow
    ctx.conversations.clear(user_id);

    let registered = match ctx.db.user_exists(user_id) {
        Ok(v) => v,
        Err(e) => {
            logger::error(LogTag::Database, &format!("user_exists failed: {}", e));
            return Ok(());
        }
    };

    if registered {
        let lang = ctx.lang(user_id);
        send_menu(
            bot,
            msg.chat.id,
            &ctx.translator.message(&lang, "welcome", &[]),
            keyboards::main_menu(&ctx.translator, &lang),
        )
        .await?;
        return Ok(());
    }

    // Remember the referrer until the registration actually completes
    if let Some(referrer) = payload
        .trim()
        .strip_prefix("ref_")
        .and_then(|s| s.parse::<i64>().ok())
    {
        if referrer != user_id {
            ctx.conversations
                .set(user_id, Conversation::ReferredBy { referrer });
        }
    }

    let lang = ctx.cfg.general.default_locale.clone();
    send_menu(
        bot,
        msg.chat.id,
        &ctx.translator.message(&lang, "first_message", &[]),
        keyboards::register_menu(&ctx.translator, &lang),
    )
    .await?;

    let note = ctx.translator.message(
        &lang,
        "new_user_notification",
        &[
            ("user_id", &user_id.to_string()),
            ("full_name", &from.full_name()),
            ("username", from.username.as_deref().unwrap_or("N/A")),
        ],
    );
    broadcast_to_admin_groups(bot, &ctx.cfg, &note, None).await;

    Ok(())
}

/// /id: user id in private chats, chat id in groups
pub async fn handle_id(bot: &Bot, msg: &Message, ctx: &Arc<AppContext>) -> ResponseResult<()> {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user_id = from.id.0 as i64;
    let lang = ctx.lang(user_id);

    let text = if msg.chat.is_private() {
        ctx.translator
            .message(&lang, "id_user", &[("user_id", &user_id.to_string())])
    } else if msg.chat.is_group() || msg.chat.is_supergroup() {
        ctx.translator
            .message(&lang, "id_chat", &[("chat_id", &msg.chat.id.to_string())])
    } else {
        ctx.translator.message(&lang, "id_other_chat", &[])
    };

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// /balance: show the balance; with a signed argument, self-mutate it -
/// allowed only while an unexpired VIP grant is in place.
pub async fn handle_balance(
    bot: &Bot,
    msg: &Message,
    ctx: &Arc<AppContext>,
    args: &str,
) -> ResponseResult<()> {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user_id = from.id.0 as i64;
    let lang = ctx.lang(user_id);

    let registered = ctx.db.user_exists(user_id).unwrap_or(false);
    if !registered {
        send_menu(
            bot,
            msg.chat.id,
            &ctx.translator.message(&lang, "user_not_found_error", &[]),
            keyboards::register_menu(&ctx.translator, &lang),
        )
        .await?;
        return Ok(());
    }

    let args = args.trim();
    if args.is_empty() {
        let balance = match ctx.db.get_balance(user_id) {
            Ok(v) => v,
            Err(e) => {
                logger::error(LogTag::Ledger, &format!("get_balance failed: {}", e));
                return Ok(());
            }
        };
        bot.send_message(
            msg.chat.id,
            ctx.translator.message(
                &lang,
                "current_balance",
                &[("value", &format_amount(balance))],
            ),
        )
        .await?;
        return Ok(());
    }

    if !ctx.db.has_balance_permission(user_id).unwrap_or(false) {
        bot.send_message(
            msg.chat.id,
            ctx.translator.message(&lang, "no_balance_permission", &[]),
        )
        .await?;
        return Ok(());
    }

    let Some(delta) = parse_signed_amount(args) else {
        bot.send_message(
            msg.chat.id,
            ctx.translator
                .message(&lang, "balance_change_syntax_error", &[]),
        )
        .await?;
        return Ok(());
    };

    match ctx.db.apply_delta(user_id, delta) {
        Ok(new_balance) => {
            logger::info(
                LogTag::Ledger,
                &format!("VIP balance change: user {} delta {}", user_id, delta),
            );
            bot.send_message(
                msg.chat.id,
                ctx.translator.message(
                    &lang,
                    "balance_changed",
                    &[("value", &format_amount(new_balance))],
                ),
            )
            .await?;
        }
        Err(crate::errors::LedgerError::InsufficientFunds { .. }) => {
            bot.send_message(
                msg.chat.id,
                ctx.translator
                    .message(&lang, "insufficient_funds_to_change", &[]),
            )
            .await?;
        }
        Err(e) => {
            logger::error(LogTag::Ledger, &format!("balance change failed: {}", e));
        }
    }

    Ok(())
}

/// /help
pub async fn handle_help(bot: &Bot, msg: &Message, ctx: &Arc<AppContext>) -> ResponseResult<()> {
    let user_id = msg.from().map(|u| u.id.0 as i64).unwrap_or_default();
    let lang = ctx.lang(user_id);
    bot.send_message(msg.chat.id, ctx.translator.message(&lang, "help_text", &[]))
        .await?;
    Ok(())
}

/// Finish a registration: create the row, credit the referrer once, clear
/// the conversation and land on the main menu.
pub async fn complete_registration(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &Arc<AppContext>,
    user_id: i64,
    username: Option<&str>,
    display_name: &str,
    referrer: Option<i64>,
) -> ResponseResult<()> {
    let lang = ctx.cfg.general.default_locale.clone();

    let created = match ctx
        .db
        .register_user(user_id, username, display_name, &lang)
    {
        Ok(v) => v,
        Err(e) => {
            logger::error(LogTag::Database, &format!("register_user failed: {}", e));
            return Ok(());
        }
    };

    if created {
        logger::info(
            LogTag::System,
            &format!("Registered user {} ({})", user_id, display_name),
        );
        // Referral counts only on a genuinely new registration
        if let Some(referrer) = referrer {
            if ctx.db.user_exists(referrer).unwrap_or(false) {
                if let Err(e) = ctx.db.increment_ref_count(referrer) {
                    logger::warning(
                        LogTag::Database,
                        &format!("Failed to credit referrer {}: {}", referrer, e),
                    );
                }
            }
        }
    }

    ctx.conversations.clear(user_id);
    send_menu(
        bot,
        chat_id,
        &ctx.translator.message(&lang, "welcome", &[]),
        keyboards::main_menu(&ctx.translator, &lang),
    )
    .await
}
