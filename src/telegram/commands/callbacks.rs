//! Callback query handlers for inline keyboard buttons
//!
//! Single entry point for every button press. The callback is answered
//! first to clear the client-side spinner, then routed by its opaque data
//! tag. Handlers that need a user record and find none redirect to
//! registration instead of failing.

use crate::database::RecipientKind;
use crate::logger::{self, LogTag};
use crate::state::Conversation;
use crate::telegram::commands::{admin, user};
use crate::telegram::formatters::{format_amount, mask_card, mask_wallet};
use crate::telegram::keyboards;
use crate::telegram::notifier::broadcast_to_admin_groups;
use crate::telegram::AppContext;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, Me, MessageId, ParseMode};

/// Send a text with an inline keyboard
pub async fn send_menu(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    keyboard: InlineKeyboardMarkup,
) -> ResponseResult<()> {
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

/// Edit the message the button was attached to when possible, otherwise
/// send a fresh one. Telegram rejects edits of old or unchanged messages;
/// falling back keeps the flow moving.
pub async fn edit_or_send(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    text: &str,
    keyboard: Option<InlineKeyboardMarkup>,
) -> ResponseResult<()> {
    if let Some(message_id) = message_id {
        let request = bot
            .edit_message_text(chat_id, message_id, text)
            .parse_mode(ParseMode::Html);
        let request = match keyboard.clone() {
            Some(kb) => request.reply_markup(kb),
            None => request,
        };
        if request.await.is_ok() {
            return Ok(());
        }
    }
    let request = bot.send_message(chat_id, text).parse_mode(ParseMode::Html);
    match keyboard {
        Some(kb) => request.reply_markup(kb).await?,
        None => request.await?,
    };
    Ok(())
}

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    ctx: Arc<AppContext>,
    me: Me,
) -> ResponseResult<()> {
    // Always answer first to remove the loading indicator
    bot.answer_callback_query(q.id.clone()).await?;

    let user_id = q.from.id.0 as i64;
    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat.id)
        .unwrap_or(ChatId(user_id));
    let message_id = q.message.as_ref().map(|m| m.id);
    let data = q.data.unwrap_or_default();

    match data.as_str() {
        "back_to_main" => {
            ctx.conversations.clear(user_id);
            show_main_or_register(&bot, chat_id, message_id, &ctx, user_id).await
        }

        // --- Registration ---
        "register" => {
            let referrer = match ctx.conversations.get(user_id) {
                Some(Conversation::ReferredBy { referrer }) => Some(referrer),
                _ => None,
            };
            ctx.conversations
                .set(user_id, Conversation::AwaitingName { referrer });
            let lang = ctx.lang(user_id);
            edit_or_send(
                &bot,
                chat_id,
                message_id,
                &ctx.translator.message(&lang, "register", &[]),
                Some(keyboards::registration_name_menu(&ctx.translator, &lang)),
            )
            .await
        }
        "use_profile_name" => {
            let Some(Conversation::AwaitingName { referrer }) = ctx.conversations.get(user_id)
            else {
                return Ok(());
            };
            user::complete_registration(
                &bot,
                chat_id,
                &ctx,
                user_id,
                q.from.username.as_deref(),
                &q.from.full_name(),
                referrer,
            )
            .await
        }

        // --- Profile ---
        "profile" => show_profile(&bot, chat_id, message_id, &ctx, user_id).await,
        "add_change_wallet" => {
            let lang = ctx.lang(user_id);
            edit_or_send(
                &bot,
                chat_id,
                message_id,
                &ctx.translator.message(&lang, "select_add_type", &[]),
                Some(keyboards::wallet_type_menu(&ctx.translator, &lang)),
            )
            .await
        }
        "add_ton_wallet" => {
            ctx.conversations.set(user_id, Conversation::AwaitingWallet);
            let lang = ctx.lang(user_id);
            edit_or_send(
                &bot,
                chat_id,
                message_id,
                &ctx.translator.message(&lang, "add_ton_wallet", &[]),
                Some(keyboards::back_to(&ctx.translator, &lang, "add_change_wallet")),
            )
            .await
        }
        "add_card" => {
            ctx.conversations.set(user_id, Conversation::AwaitingCard);
            let lang = ctx.lang(user_id);
            edit_or_send(
                &bot,
                chat_id,
                message_id,
                &ctx.translator.message(&lang, "add_card", &[]),
                Some(keyboards::back_to(&ctx.translator, &lang, "add_change_wallet")),
            )
            .await
        }

        // --- Language ---
        "change_language" => {
            ctx.conversations
                .set(user_id, Conversation::ChoosingLanguage);
            let lang = ctx.lang(user_id);
            edit_or_send(
                &bot,
                chat_id,
                message_id,
                &ctx.translator.message(&lang, "choose_language", &[]),
                Some(keyboards::language_menu(&ctx.translator, &lang)),
            )
            .await
        }
        "set_english" | "set_russian" => {
            if !matches!(
                ctx.conversations.get(user_id),
                Some(Conversation::ChoosingLanguage)
            ) {
                return Ok(());
            }
            let new_lang = if data == "set_english" { "en" } else { "ru" };
            if let Err(e) = ctx.db.set_language(user_id, new_lang) {
                logger::error(LogTag::Database, &format!("set_language failed: {}", e));
            }
            ctx.conversations.clear(user_id);
            show_main_or_register(&bot, chat_id, message_id, &ctx, user_id).await
        }

        // --- P2P listings (read-only for users) ---
        "p2p" => show_pairs(&bot, chat_id, message_id, &ctx, user_id).await,

        // --- Referral link ---
        "ref_link" => {
            let lang = ctx.lang(user_id);
            let Some(record) = require_user(&bot, chat_id, message_id, &ctx, user_id).await? else {
                return Ok(());
            };
            let link = format!("https://t.me/{}?start=ref_{}", me.username(), user_id);
            edit_or_send(
                &bot,
                chat_id,
                message_id,
                &ctx.translator.message(
                    &lang,
                    "ref_link_text",
                    &[
                        ("referral_link", &format!("<code>{}</code>", link)),
                        ("ref_count", &record.ref_count.to_string()),
                    ],
                ),
                Some(keyboards::back_to(&ctx.translator, &lang, "back_to_main")),
            )
            .await
        }

        // --- Withdrawal flow ---
        "create_deal" => {
            let lang = ctx.lang(user_id);
            let Some(record) = require_user(&bot, chat_id, message_id, &ctx, user_id).await? else {
                return Ok(());
            };
            // A payout wallet must be attached before withdrawing
            if record.ton_wallet.is_none() {
                return edit_or_send(
                    &bot,
                    chat_id,
                    message_id,
                    &ctx.translator.message(&lang, "wallet_not_added_warning", &[]),
                    Some(keyboards::wallet_type_menu(&ctx.translator, &lang)),
                )
                .await;
            }
            ctx.conversations
                .set(user_id, Conversation::DealChoosingRecipient);
            edit_or_send(
                &bot,
                chat_id,
                message_id,
                &ctx.translator
                    .message(&lang, "p2p_enter_recipient_type", &[]),
                Some(keyboards::deal_recipient_menu(&ctx.translator, &lang)),
            )
            .await
        }
        "add_recipient_ton_wallet" | "add_recipient_card" => {
            if !matches!(
                ctx.conversations.get(user_id),
                Some(Conversation::DealChoosingRecipient)
            ) {
                return Ok(());
            }
            let (kind, prompt) = if data == "add_recipient_ton_wallet" {
                (RecipientKind::Wallet, "p2p_enter_recipient_wallet")
            } else {
                (RecipientKind::Card, "p2p_enter_recipient_card")
            };
            ctx.conversations
                .set(user_id, Conversation::DealEnteringAddress { kind });
            let lang = ctx.lang(user_id);
            edit_or_send(
                &bot,
                chat_id,
                message_id,
                &ctx.translator.message(&lang, prompt, &[]),
                Some(keyboards::back_to(&ctx.translator, &lang, "create_deal")),
            )
            .await
        }
        "confirm_deal" => submit_withdrawal(&bot, chat_id, message_id, &ctx, user_id).await,
        "decline_deal" => {
            if !matches!(
                ctx.conversations.get(user_id),
                Some(Conversation::DealAwaitingConfirmation { .. })
            ) {
                return Ok(());
            }
            ctx.conversations.clear(user_id);
            let lang = ctx.lang(user_id);
            edit_or_send(
                &bot,
                chat_id,
                message_id,
                &ctx.translator.message(&lang, "deal_canceled", &[]),
                Some(keyboards::back_to_main(&ctx.translator, &lang)),
            )
            .await
        }

        // --- Top-up flow ---
        "top_up_wallet" => {
            let lang = ctx.lang(user_id);
            if require_user(&bot, chat_id, message_id, &ctx, user_id)
                .await?
                .is_none()
            {
                return Ok(());
            }
            ctx.conversations
                .set(user_id, Conversation::TopUpEnteringAmount);
            edit_or_send(
                &bot,
                chat_id,
                message_id,
                &ctx.translator.message(
                    &lang,
                    "top_up_wallet_text",
                    &[("ton_wallet_address", &ctx.cfg.exchange.deposit_wallet)],
                ),
                Some(keyboards::back_to(&ctx.translator, &lang, "back_to_main")),
            )
            .await
        }
        "confirm_top_up" => submit_topup(&bot, chat_id, message_id, &ctx, user_id).await,
        "cancel_top_up" => {
            if !matches!(
                ctx.conversations.get(user_id),
                Some(Conversation::TopUpAwaitingConfirmation { .. })
            ) {
                return Ok(());
            }
            ctx.conversations.clear(user_id);
            let lang = ctx.lang(user_id);
            edit_or_send(
                &bot,
                chat_id,
                message_id,
                &ctx.translator.message(&lang, "top_up_canceled", &[]),
                Some(keyboards::back_to_main(&ctx.translator, &lang)),
            )
            .await
        }

        // --- Admin decisions on pending requests ---
        _ if data.starts_with("admin_confirm_deal:") || data.starts_with("admin_decline_deal:") => {
            let approve = data.starts_with("admin_confirm_deal:");
            let Some(deal_id) = data.split(':').nth(1).and_then(|s| s.parse::<i64>().ok())
            else {
                return Ok(());
            };
            admin::handle_deal_decision(
                &bot, &ctx, chat_id, message_id, user_id, deal_id, approve,
            )
            .await
        }

        // --- Admin P2P management ---
        _ if data.starts_with("admin_")
            || data.starts_with("back_to_admin_panel")
            || data.starts_with("confirm_remove_pair_")
            || data.starts_with("select_listing_pair_")
            || data.starts_with("add_listing_")
            || data.starts_with("remove_listing_")
            || data.starts_with("confirm_remove_listing_") =>
        {
            admin::handle_admin_callback(&bot, &ctx, chat_id, message_id, user_id, &data).await
        }

        _ if data.starts_with("p2p_") => {
            let pair = data.trim_start_matches("p2p_");
            show_listings(&bot, chat_id, message_id, &ctx, user_id, pair).await
        }

        _ => {
            logger::debug(LogTag::Telegram, &format!("Unknown callback: {}", data));
            Ok(())
        }
    }
}

// ============================================================================
// SCREENS
// ============================================================================

/// Main menu for registered users, registration prompt otherwise
pub async fn show_main_or_register(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    ctx: &Arc<AppContext>,
    user_id: i64,
) -> ResponseResult<()> {
    let lang = ctx.lang(user_id);
    if ctx.db.user_exists(user_id).unwrap_or(false) {
        edit_or_send(
            bot,
            chat_id,
            message_id,
            &ctx.translator.message(&lang, "welcome", &[]),
            Some(keyboards::main_menu(&ctx.translator, &lang)),
        )
        .await
    } else {
        edit_or_send(
            bot,
            chat_id,
            message_id,
            &ctx.translator.message(&lang, "first_message", &[]),
            Some(keyboards::register_menu(&ctx.translator, &lang)),
        )
        .await
    }
}

/// Fetch the user record or redirect to registration
async fn require_user(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    ctx: &Arc<AppContext>,
    user_id: i64,
) -> ResponseResult<Option<crate::database::User>> {
    match ctx.db.get_user(user_id) {
        Ok(Some(user)) => Ok(Some(user)),
        Ok(None) => {
            let lang = ctx.lang(user_id);
            edit_or_send(
                bot,
                chat_id,
                message_id,
                &ctx.translator.message(&lang, "user_not_found_error", &[]),
                Some(keyboards::register_menu(&ctx.translator, &lang)),
            )
            .await?;
            Ok(None)
        }
        Err(e) => {
            logger::error(LogTag::Database, &format!("get_user failed: {}", e));
            Ok(None)
        }
    }
}

async fn show_profile(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    ctx: &Arc<AppContext>,
    user_id: i64,
) -> ResponseResult<()> {
    let Some(record) = require_user(bot, chat_id, message_id, ctx, user_id).await? else {
        return Ok(());
    };
    let lang = ctx.lang(user_id);
    let not_added = ctx.translator.message(&lang, "not_added", &[]);

    let text = ctx.translator.message(
        &lang,
        "profile_text",
        &[
            ("balance", &format_amount(record.balance)),
            (
                "ton_wallet",
                &mask_wallet(record.ton_wallet.as_deref().unwrap_or(""), &not_added),
            ),
            (
                "card_number",
                &mask_card(record.card_number.as_deref().unwrap_or(""), &not_added),
            ),
            ("deals_count", &record.deals_count.to_string()),
        ],
    );
    edit_or_send(
        bot,
        chat_id,
        message_id,
        &text,
        Some(keyboards::profile_menu(&ctx.translator, &lang)),
    )
    .await
}

async fn show_pairs(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    ctx: &Arc<AppContext>,
    user_id: i64,
) -> ResponseResult<()> {
    let lang = ctx.lang(user_id);
    let pairs = match ctx.db.get_all_pairs() {
        Ok(v) => v,
        Err(e) => {
            logger::error(LogTag::Database, &format!("get_all_pairs failed: {}", e));
            return Ok(());
        }
    };
    edit_or_send(
        bot,
        chat_id,
        message_id,
        &ctx.translator.message(&lang, "p2p_description", &[]),
        Some(keyboards::p2p_pairs_menu(&ctx.translator, &lang, &pairs)),
    )
    .await
}

async fn show_listings(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    ctx: &Arc<AppContext>,
    user_id: i64,
    pair: &str,
) -> ResponseResult<()> {
    let lang = ctx.lang(user_id);
    let listings = match ctx.db.get_listings(pair) {
        Ok(v) => v,
        Err(e) => {
            logger::error(LogTag::Database, &format!("get_listings failed: {}", e));
            return Ok(());
        }
    };

    let text = if listings.is_empty() {
        ctx.translator.message(&lang, "no_active_traders", &[])
    } else {
        let mut text = ctx.translator.message(
            &lang,
            "p2p_traders_header",
            &[("currency_pair", &pair.replace('_', " > "))],
        );
        text.push_str("\n\n");
        for listing in &listings {
            text.push_str(&ctx.translator.message(
                &lang,
                "p2p_trader_format",
                &[
                    ("nickname", listing.nickname.as_str()),
                    ("currency_pair", &pair.replace('_', " > ")),
                    ("price", listing.price.as_str()),
                    ("limit", listing.limit.as_str()),
                    ("action", listing.action.as_str()),
                ],
            ));
            text.push('\n');
        }
        text
    };

    edit_or_send(
        bot,
        chat_id,
        message_id,
        &text,
        Some(keyboards::back_to(&ctx.translator, &lang, "p2p")),
    )
    .await
}

// ============================================================================
// LEDGER-TOUCHING SUBMISSIONS
// ============================================================================

/// User confirmed the withdrawal summary: reserve the funds, persist the
/// pending deal, then notify - mutate first, send after.
async fn submit_withdrawal(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    ctx: &Arc<AppContext>,
    user_id: i64,
) -> ResponseResult<()> {
    let Some(Conversation::DealAwaitingConfirmation {
        kind,
        address,
        amount,
    }) = ctx.conversations.get(user_id)
    else {
        // Stale button from an abandoned flow
        return Ok(());
    };

    let lang = ctx.lang(user_id);
    let currency = match kind {
        RecipientKind::Wallet => ctx.cfg.exchange.wallet_currency.clone(),
        RecipientKind::Card => ctx.cfg.exchange.card_currency.clone(),
    };

    match ctx
        .db
        .create_withdrawal(user_id, kind, &address, amount, &currency)
    {
        Ok(deal) => {
            ctx.conversations.clear(user_id);
            logger::info(
                LogTag::Ledger,
                &format!(
                    "Withdrawal #{} created: user {} amount {} {}",
                    deal.id, user_id, deal.amount, deal.currency
                ),
            );

            edit_or_send(
                bot,
                chat_id,
                message_id,
                &ctx.translator.message(
                    &lang,
                    "deal_submitted",
                    &[
                        ("currency", &currency),
                        ("amount", &format_amount(amount)),
                        ("address", &address),
                    ],
                ),
                Some(keyboards::back_to_main(&ctx.translator, &lang)),
            )
            .await?;

            let sender = ctx.db.get_user(user_id).ok().flatten();
            let sender_name = sender.map(|u| u.full_name).unwrap_or_default();
            let note = format!(
                "💸 <b>Withdrawal request #{}</b>\n\n\
                 From: {} (ID <code>{}</code>)\n\
                 Destination ({}): <code>{}</code>\n\
                 Amount: {} {}",
                deal.id,
                sender_name,
                user_id,
                kind.as_str(),
                address,
                format_amount(amount),
                currency
            );
            broadcast_to_admin_groups(
                bot,
                &ctx.cfg,
                &note,
                Some(keyboards::admin_decision_menu(deal.id)),
            )
            .await;
            Ok(())
        }
        Err(crate::errors::LedgerError::InsufficientFunds { .. }) => {
            // Balance changed since the amount was validated; abort cleanly
            ctx.conversations.clear(user_id);
            edit_or_send(
                bot,
                chat_id,
                message_id,
                &ctx.translator.message(&lang, "p2p_insufficient_balance", &[]),
                Some(keyboards::back_to_main(&ctx.translator, &lang)),
            )
            .await
        }
        Err(e) => {
            logger::error(LogTag::Ledger, &format!("create_withdrawal failed: {}", e));
            Ok(())
        }
    }
}

/// User confirmed the top-up amount: persist the pending request (no funds
/// move yet) and notify the admin groups.
async fn submit_topup(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    ctx: &Arc<AppContext>,
    user_id: i64,
) -> ResponseResult<()> {
    let Some(Conversation::TopUpAwaitingConfirmation { amount }) = ctx.conversations.get(user_id)
    else {
        return Ok(());
    };

    let lang = ctx.lang(user_id);
    let currency = ctx.cfg.exchange.wallet_currency.clone();

    match ctx.db.create_topup(user_id, amount, &currency) {
        Ok(deal) => {
            ctx.conversations.clear(user_id);
            logger::info(
                LogTag::Ledger,
                &format!(
                    "Top-up #{} requested: user {} amount {} {}",
                    deal.id, user_id, deal.amount, deal.currency
                ),
            );

            edit_or_send(
                bot,
                chat_id,
                message_id,
                &ctx.translator.message(&lang, "top_up_request_sent", &[]),
                Some(keyboards::back_to_main(&ctx.translator, &lang)),
            )
            .await?;

            let sender = ctx.db.get_user(user_id).ok().flatten();
            let sender_name = sender.map(|u| u.full_name).unwrap_or_default();
            let note = format!(
                "💳 <b>Top-up request #{}</b>\n\n\
                 From: {} (ID <code>{}</code>)\n\
                 Amount: {} {}",
                deal.id,
                sender_name,
                user_id,
                format_amount(amount),
                currency
            );
            broadcast_to_admin_groups(
                bot,
                &ctx.cfg,
                &note,
                Some(keyboards::admin_decision_menu(deal.id)),
            )
            .await;
            Ok(())
        }
        Err(e) => {
            logger::error(LogTag::Ledger, &format!("create_topup failed: {}", e));
            Ok(())
        }
    }
}
