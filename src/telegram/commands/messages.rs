//! Free-text input, driven by the per-user conversation state
//!
//! A message only means something when the user is inside a multi-step flow;
//! with no active state the text is ignored. Validation failures re-prompt
//! the same step and keep the state, so the user can just try again.

use crate::database::RecipientKind;
use crate::logger::{self, LogTag};
use crate::state::Conversation;
use crate::telegram::commands::user::complete_registration;
use crate::telegram::formatters::format_amount;
use crate::telegram::keyboards;
use crate::telegram::AppContext;
use crate::validation::{is_valid_name, is_valid_wallet, normalize_card, parse_amount};
use rust_decimal::Decimal;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};

pub async fn handle_message(bot: Bot, msg: Message, ctx: Arc<AppContext>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(from) = msg.from() else {
        return Ok(());
    };
    // Multi-step flows run in private chats only
    if !msg.chat.is_private() {
        return Ok(());
    }
    // Unrecognized commands are not flow input
    if text.starts_with('/') {
        return Ok(());
    }

    let user_id = from.id.0 as i64;
    let Some(state) = ctx.conversations.get(user_id) else {
        return Ok(());
    };
    let chat_id = msg.chat.id;
    let lang = ctx.lang(user_id);
    let text = text.trim();

    match state {
        // --- Registration ---
        Conversation::AwaitingName { referrer } => {
            if !is_valid_name(text) {
                bot.send_message(
                    chat_id,
                    ctx.translator.message(&lang, "name_validation_error", &[]),
                )
                .await?;
                return Ok(());
            }
            complete_registration(
                &bot,
                chat_id,
                &ctx,
                user_id,
                from.username.as_deref(),
                text,
                referrer,
            )
            .await
        }

        // --- Profile destinations ---
        Conversation::AwaitingWallet => {
            if !is_valid_wallet(text) {
                bot.send_message(
                    chat_id,
                    ctx.translator.message(&lang, "wallet_validation_error", &[]),
                )
                .await?;
                return Ok(());
            }
            if let Err(e) = ctx.db.set_wallet(user_id, text) {
                logger::error(LogTag::Database, &format!("set_wallet failed: {}", e));
                return Ok(());
            }
            ctx.conversations.clear(user_id);
            bot.send_message(
                chat_id,
                ctx.translator.message(&lang, "wallet_added_success", &[]),
            )
            .await?;
            send_main_menu(&bot, chat_id, &ctx, &lang).await
        }
        Conversation::AwaitingCard => {
            let Some(card) = normalize_card(text) else {
                bot.send_message(
                    chat_id,
                    ctx.translator.message(&lang, "card_validation_error", &[]),
                )
                .await?;
                return Ok(());
            };
            if let Err(e) = ctx.db.set_card(user_id, &card) {
                logger::error(LogTag::Database, &format!("set_card failed: {}", e));
                return Ok(());
            }
            ctx.conversations.clear(user_id);
            bot.send_message(
                chat_id,
                ctx.translator.message(&lang, "card_added_success", &[]),
            )
            .await?;
            send_main_menu(&bot, chat_id, &ctx, &lang).await
        }

        // --- Withdrawal flow ---
        Conversation::DealEnteringAddress { kind } => match kind {
            RecipientKind::Wallet => {
                if !is_valid_wallet(text) {
                    bot.send_message(
                        chat_id,
                        ctx.translator.message(&lang, "wallet_validation_error", &[]),
                    )
                    .await?;
                    return Ok(());
                }
                ctx.conversations.set(
                    user_id,
                    Conversation::DealEnteringAmount {
                        kind,
                        address: text.to_string(),
                    },
                );
                bot.send_message(
                    chat_id,
                    ctx.translator.message(&lang, "p2p_wallet_added_success", &[]),
                )
                .await?;
                bot.send_message(
                    chat_id,
                    ctx.translator.message(&lang, "p2p_enter_ton_amount", &[]),
                )
                .await?;
                Ok(())
            }
            RecipientKind::Card => {
                let Some(card) = normalize_card(text) else {
                    bot.send_message(
                        chat_id,
                        ctx.translator.message(&lang, "card_validation_error", &[]),
                    )
                    .await?;
                    return Ok(());
                };
                ctx.conversations.set(
                    user_id,
                    Conversation::DealEnteringAmount {
                        kind,
                        address: card,
                    },
                );
                bot.send_message(
                    chat_id,
                    ctx.translator.message(&lang, "p2p_card_added_success", &[]),
                )
                .await?;
                bot.send_message(
                    chat_id,
                    ctx.translator.message(&lang, "p2p_enter_rub_amount", &[]),
                )
                .await?;
                Ok(())
            }
        },
        Conversation::DealEnteringAmount { kind, address } => {
            let Some(amount) = parse_amount(text) else {
                bot.send_message(
                    chat_id,
                    ctx.translator.message(&lang, "p2p_invalid_amount", &[]),
                )
                .await?;
                return Ok(());
            };

            let balance = match ctx.db.get_balance(user_id) {
                Ok(v) => v,
                Err(e) => {
                    logger::error(LogTag::Ledger, &format!("get_balance failed: {}", e));
                    return Ok(());
                }
            };
            // Strict comparison: spending the exact balance is allowed
            if amount > balance {
                ctx.conversations.clear(user_id);
                bot.send_message(
                    chat_id,
                    ctx.translator.message(&lang, "p2p_insufficient_balance", &[]),
                )
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::back_to_main(&ctx.translator, &lang))
                .await?;
                return Ok(());
            }

            let summary = deal_summary(&ctx, &lang, kind, &address, amount);
            ctx.conversations.set(
                user_id,
                Conversation::DealAwaitingConfirmation {
                    kind,
                    address,
                    amount,
                },
            );
            bot.send_message(chat_id, summary)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::deal_confirm_menu(&ctx.translator, &lang))
                .await?;
            Ok(())
        }

        // --- Top-up flow ---
        Conversation::TopUpEnteringAmount => {
            let Some(amount) = parse_amount(text) else {
                bot.send_message(
                    chat_id,
                    ctx.translator.message(&lang, "top_up_invalid_amount", &[]),
                )
                .await?;
                return Ok(());
            };
            ctx.conversations
                .set(user_id, Conversation::TopUpAwaitingConfirmation { amount });
            bot.send_message(
                chat_id,
                ctx.translator.message(
                    &lang,
                    "top_up_confirm",
                    &[("amount", &format_amount(amount))],
                ),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::topup_confirm_menu(&ctx.translator, &lang))
            .await?;
            Ok(())
        }

        // --- Admin listing entry ---
        Conversation::AdminAddingPair => {
            if !ctx.cfg.is_admin(user_id, None) {
                return Ok(());
            }
            let pair = text.to_uppercase();
            let added = ctx.db.add_pair(&pair).unwrap_or(false);
            ctx.conversations.clear(user_id);
            let reply = if added {
                logger::info(LogTag::Admin, &format!("Pair {} added by {}", pair, user_id));
                format!("✅ Pair {} added.", pair)
            } else {
                format!("⚠️ Pair {} already exists.", pair)
            };
            bot.send_message(chat_id, reply)
                .reply_markup(keyboards::admin_p2p_menu())
                .await?;
            Ok(())
        }
        Conversation::AdminListingNickname { pair } => {
            if !ctx.cfg.is_admin(user_id, None) {
                return Ok(());
            }
            ctx.conversations.set(
                user_id,
                Conversation::AdminListingPrice {
                    pair,
                    nickname: text.to_string(),
                },
            );
            bot.send_message(
                chat_id,
                "Step 2/4: enter the price (e.g. '4.40$' or '0.0001 BTC').",
            )
            .await?;
            Ok(())
        }
        Conversation::AdminListingPrice { pair, nickname } => {
            if !ctx.cfg.is_admin(user_id, None) {
                return Ok(());
            }
            ctx.conversations.set(
                user_id,
                Conversation::AdminListingLimit {
                    pair,
                    nickname,
                    price: text.to_string(),
                },
            );
            bot.send_message(chat_id, "Step 3/4: enter the limit (e.g. '10 TON').")
                .await?;
            Ok(())
        }
        Conversation::AdminListingLimit {
            pair,
            nickname,
            price,
        } => {
            if !ctx.cfg.is_admin(user_id, None) {
                return Ok(());
            }
            ctx.conversations.set(
                user_id,
                Conversation::AdminListingAction {
                    pair,
                    nickname,
                    price,
                    limit: text.to_string(),
                },
            );
            bot.send_message(chat_id, "Step 4/4: choose the direction:")
                .reply_markup(keyboards::admin_listing_action_pick_menu())
                .await?;
            Ok(())
        }

        // Text means nothing in these states
        Conversation::ReferredBy { .. }
        | Conversation::ChoosingLanguage
        | Conversation::DealChoosingRecipient
        | Conversation::DealAwaitingConfirmation { .. }
        | Conversation::TopUpAwaitingConfirmation { .. }
        | Conversation::AdminListingMenu { .. }
        | Conversation::AdminListingAction { .. } => Ok(()),
    }
}

async fn send_main_menu(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &Arc<AppContext>,
    lang: &str,
) -> ResponseResult<()> {
    bot.send_message(chat_id, ctx.translator.message(lang, "welcome", &[]))
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::main_menu(&ctx.translator, lang))
        .await?;
    Ok(())
}

/// Human-readable summary shown before the user commits a withdrawal
fn deal_summary(
    ctx: &AppContext,
    lang: &str,
    kind: RecipientKind,
    address: &str,
    amount: Decimal,
) -> String {
    let destination = match kind {
        RecipientKind::Wallet => ctx.translator.button(lang, "add_ton_wallet"),
        RecipientKind::Card => ctx.translator.button(lang, "add_card"),
    };
    let currency = match kind {
        RecipientKind::Wallet => &ctx.cfg.exchange.wallet_currency,
        RecipientKind::Card => &ctx.cfg.exchange.card_currency,
    };
    format!(
        "{}\n\n<b>{}:</b> {}\n<b>{}:</b> <code>{}</code>\n<b>{}:</b> {} {}",
        ctx.translator.message(lang, "p2p_confirm_deal_header", &[]),
        ctx.translator.message(lang, "p2p_recipient_type", &[]),
        destination,
        ctx.translator.message(lang, "p2p_recipient_address", &[]),
        address,
        ctx.translator.message(lang, "p2p_transfer_amount", &[]),
        format_amount(amount),
        currency
    )
}
