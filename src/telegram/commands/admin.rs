//! Administrator commands and callbacks
//!
//! Every entry point here starts with the capability check; unauthorized
//! presses are logged and ignored rather than answered, so the admin
//! surface stays invisible to regular users.

use crate::database::models::{DealKind, DealStatus, DecisionOutcome};
use crate::errors::LedgerError;
use crate::logger::{self, LogTag};
use crate::state::Conversation;
use crate::telegram::commands::callbacks::edit_or_send;
use crate::telegram::formatters::format_amount;
use crate::telegram::keyboards;
use crate::telegram::notifier::notify_user;
use crate::telegram::AppContext;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ParseMode};

/// Check the actor and log refused attempts
fn authorized(ctx: &AppContext, user_id: i64, chat_id: Option<i64>) -> bool {
    match ctx.cfg.ensure_admin(user_id, chat_id) {
        Ok(()) => true,
        Err(e) => {
            logger::warning(LogTag::Admin, &format!("Refused admin action: {}", e));
            false
        }
    }
}

/// /admin - panel entry
pub async fn handle_admin_panel(
    bot: &Bot,
    msg: &Message,
    ctx: &Arc<AppContext>,
) -> ResponseResult<()> {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    if !authorized(ctx, from.id.0 as i64, Some(msg.chat.id.0)) {
        return Ok(());
    }
    bot.send_message(msg.chat.id, "🛠 <b>Admin panel</b>")
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::admin_panel_menu())
        .await?;
    Ok(())
}

/// /addvip <user_id> <days> - grant temporary self-service balance rights
pub async fn handle_addvip(
    bot: &Bot,
    msg: &Message,
    ctx: &Arc<AppContext>,
    args: &str,
) -> ResponseResult<()> {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    if !authorized(ctx, from.id.0 as i64, Some(msg.chat.id.0)) {
        return Ok(());
    }

    let parts: Vec<&str> = args.split_whitespace().collect();
    let parsed = match parts.as_slice() {
        [user, days] => match (user.parse::<i64>(), days.parse::<i64>()) {
            (Ok(user), Ok(days)) if days > 0 => Some((user, days)),
            _ => None,
        },
        _ => None,
    };
    let Some((target, days)) = parsed else {
        bot.send_message(msg.chat.id, "Usage: /addvip <user_id> <days>")
            .await?;
        return Ok(());
    };

    if !ctx.db.user_exists(target).unwrap_or(false) {
        bot.send_message(msg.chat.id, format!("User {} is not registered.", target))
            .await?;
        return Ok(());
    }

    match ctx.db.grant_balance_permission(target, days) {
        Ok(expires_at) => {
            logger::info(
                LogTag::Admin,
                &format!(
                    "Balance permission granted to {} for {} days by {}",
                    target, days, from.id
                ),
            );
            bot.send_message(
                msg.chat.id,
                format!(
                    "✅ User {} may edit their balance until {}.",
                    target,
                    expires_at.format("%Y-%m-%d %H:%M UTC")
                ),
            )
            .await?;
        }
        Err(e) => {
            logger::error(LogTag::Admin, &format!("grant failed: {}", e));
        }
    }
    Ok(())
}

/// /rmvip <user_id> - revoke the grant
pub async fn handle_rmvip(
    bot: &Bot,
    msg: &Message,
    ctx: &Arc<AppContext>,
    args: &str,
) -> ResponseResult<()> {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    if !authorized(ctx, from.id.0 as i64, Some(msg.chat.id.0)) {
        return Ok(());
    }

    let Some(target) = args.trim().parse::<i64>().ok() else {
        bot.send_message(msg.chat.id, "Usage: /rmvip <user_id>")
            .await?;
        return Ok(());
    };

    match ctx.db.revoke_balance_permission(target) {
        Ok(true) => {
            logger::info(
                LogTag::Admin,
                &format!("Balance permission revoked for {} by {}", target, from.id),
            );
            bot.send_message(msg.chat.id, format!("✅ Permission revoked for {}.", target))
                .await?;
        }
        Ok(false) => {
            bot.send_message(msg.chat.id, format!("User {} had no permission.", target))
                .await?;
        }
        Err(e) => {
            logger::error(LogTag::Admin, &format!("revoke failed: {}", e));
        }
    }
    Ok(())
}

// ============================================================================
// DEAL DECISIONS
// ============================================================================

/// Apply an admin confirm/decline button press to a pending request.
///
/// The ledger transition commits first; every notification afterwards is
/// best-effort and can never undo it. A replayed press surfaces as
/// `AlreadyProcessed` and changes nothing.
pub async fn handle_deal_decision(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    actor_id: i64,
    deal_id: i64,
    approve: bool,
) -> ResponseResult<()> {
    if !authorized(ctx, actor_id, Some(chat_id.0)) {
        return Ok(());
    }

    let result = if approve {
        ctx.db.confirm_deal(deal_id)
    } else {
        ctx.db.decline_deal(deal_id)
    };

    match result {
        Ok(outcome) => {
            logger::info(
                LogTag::Ledger,
                &format!(
                    "Deal #{} {} by admin {}",
                    deal_id,
                    outcome.deal.status.as_str(),
                    actor_id
                ),
            );
            // Replace the request card in the group so the buttons disappear
            let verdict = match outcome.deal.status {
                DealStatus::Confirmed => "✅ confirmed",
                DealStatus::Declined => "❌ declined",
                DealStatus::Pending => "pending",
            };
            edit_or_send(
                bot,
                chat_id,
                message_id,
                &format!(
                    "Request #{} {} ({} {}).",
                    deal_id,
                    verdict,
                    format_amount(outcome.deal.amount),
                    outcome.deal.currency
                ),
                None,
            )
            .await?;

            notify_parties(bot, ctx, &outcome).await;
        }
        Err(LedgerError::AlreadyProcessed(id)) => {
            bot.send_message(chat_id, format!("⚠️ Request #{} was already processed.", id))
                .await?;
        }
        Err(LedgerError::DealNotFound(id)) => {
            bot.send_message(chat_id, format!("⚠️ Request #{} not found.", id))
                .await?;
        }
        Err(e) => {
            logger::error(
                LogTag::Ledger,
                &format!("Decision on deal #{} failed: {}", deal_id, e),
            );
        }
    }
    Ok(())
}

/// Tell the sender (and a credited counterparty, if any) what happened.
/// Failures here are logged per recipient and never propagate.
async fn notify_parties(bot: &Bot, ctx: &Arc<AppContext>, outcome: &DecisionOutcome) {
    let deal = &outcome.deal;
    let lang = ctx.lang(deal.sender_id);
    let amount = format_amount(deal.amount);

    let sender_text = match (deal.kind, deal.status) {
        (DealKind::Withdrawal, DealStatus::Confirmed) => ctx.translator.message(
            &lang,
            "deal_confirmed_user",
            &[("amount", amount.as_str()), ("currency", deal.currency.as_str())],
        ),
        (DealKind::Withdrawal, DealStatus::Declined) => ctx.translator.message(
            &lang,
            "deal_declined_user",
            &[("amount", amount.as_str()), ("currency", deal.currency.as_str())],
        ),
        (DealKind::TopUp, DealStatus::Confirmed) => ctx.translator.message(
            &lang,
            "top_up_confirmed_user",
            &[("balance", format_amount(outcome.sender_balance).as_str())],
        ),
        (DealKind::TopUp, DealStatus::Declined) => {
            ctx.translator.message(&lang, "top_up_declined_user", &[])
        }
        _ => return,
    };
    notify_user(bot, deal.sender_id, &sender_text).await;

    if let Some((counterparty, _)) = outcome.counterparty {
        let their_lang = ctx.lang(counterparty);
        let text = ctx.translator.message(
            &their_lang,
            "recipient_credited",
            &[("amount", amount.as_str()), ("currency", deal.currency.as_str())],
        );
        notify_user(bot, counterparty, &text).await;
    }
}

// ============================================================================
// P2P PAIR / LISTING MANAGEMENT
// ============================================================================

/// Route the admin panel's P2P management callbacks
pub async fn handle_admin_callback(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    user_id: i64,
    data: &str,
) -> ResponseResult<()> {
    if !authorized(ctx, user_id, Some(chat_id.0)) {
        return Ok(());
    }

    match data {
        "back_to_admin_panel" => {
            ctx.conversations.clear(user_id);
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "🛠 <b>Admin panel</b>",
                Some(keyboards::admin_panel_menu()),
            )
            .await
        }
        "admin_p2p_manage" => {
            ctx.conversations.clear(user_id);
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "📊 <b>P2P management</b>",
                Some(keyboards::admin_p2p_menu()),
            )
            .await
        }
        "admin_p2p_add_pair" => {
            ctx.conversations.set(user_id, Conversation::AdminAddingPair);
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "Enter the new pair name as CUR1_CUR2 (e.g. TON_RUB).",
                None,
            )
            .await
        }
        "admin_p2p_remove_pair" => {
            let pairs = ctx.db.get_all_pairs().unwrap_or_default();
            if pairs.is_empty() {
                return edit_or_send(
                    bot,
                    chat_id,
                    message_id,
                    "No pairs to remove.",
                    Some(keyboards::admin_p2p_menu()),
                )
                .await;
            }
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "Choose a pair to remove:",
                Some(keyboards::admin_pairs_menu(
                    &pairs,
                    "confirm_remove_pair_",
                    "admin_p2p_manage",
                )),
            )
            .await
        }
        _ if data.starts_with("confirm_remove_pair_") => {
            let pair = data.trim_start_matches("confirm_remove_pair_");
            let removed = ctx.db.remove_pair(pair).unwrap_or(false);
            let text = if removed {
                logger::info(
                    LogTag::Admin,
                    &format!("Pair {} removed by {}", pair, user_id),
                );
                format!("✅ Pair {} and all its listings removed.", pair)
            } else {
                format!("⚠️ Pair {} not found.", pair)
            };
            edit_or_send(
                bot,
                chat_id,
                message_id,
                &text,
                Some(keyboards::admin_p2p_menu()),
            )
            .await
        }
        "admin_p2p_manage_listings" => {
            let pairs = ctx.db.get_all_pairs().unwrap_or_default();
            if pairs.is_empty() {
                return edit_or_send(
                    bot,
                    chat_id,
                    message_id,
                    "Create at least one pair first.",
                    Some(keyboards::admin_p2p_menu()),
                )
                .await;
            }
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "Choose a pair to manage:",
                Some(keyboards::admin_pairs_menu(
                    &pairs,
                    "select_listing_pair_",
                    "admin_p2p_manage",
                )),
            )
            .await
        }
        _ if data.starts_with("select_listing_pair_") => {
            let pair = data.trim_start_matches("select_listing_pair_").to_string();
            show_listing_menu(bot, ctx, chat_id, message_id, user_id, &pair).await
        }
        "add_listing_start" => {
            let Some(Conversation::AdminListingMenu { pair }) = ctx.conversations.get(user_id)
            else {
                return Ok(());
            };
            ctx.conversations
                .set(user_id, Conversation::AdminListingNickname { pair });
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "Step 1/4: enter the trader nickname.",
                None,
            )
            .await
        }
        "remove_listing_start" => {
            let Some(Conversation::AdminListingMenu { pair }) = ctx.conversations.get(user_id)
            else {
                return Ok(());
            };
            let listings = ctx.db.get_listings(&pair).unwrap_or_default();
            if listings.is_empty() {
                return edit_or_send(
                    bot,
                    chat_id,
                    message_id,
                    "No listings to remove in this pair.",
                    Some(keyboards::admin_listing_actions_menu()),
                )
                .await;
            }
            let back = format!("select_listing_pair_{}", pair);
            edit_or_send(
                bot,
                chat_id,
                message_id,
                "Choose a listing to remove:",
                Some(keyboards::admin_listings_remove_menu(&listings, &back)),
            )
            .await
        }
        _ if data.starts_with("confirm_remove_listing_") => {
            let Some(listing_id) = data
                .trim_start_matches("confirm_remove_listing_")
                .parse::<i64>()
                .ok()
            else {
                return Ok(());
            };
            let removed = ctx.db.remove_listing(listing_id).unwrap_or(false);
            if removed {
                logger::info(
                    LogTag::Admin,
                    &format!("Listing {} removed by {}", listing_id, user_id),
                );
            }
            match ctx.conversations.get(user_id) {
                Some(Conversation::AdminListingMenu { pair }) => {
                    show_listing_menu(bot, ctx, chat_id, message_id, user_id, &pair).await
                }
                _ => {
                    edit_or_send(
                        bot,
                        chat_id,
                        message_id,
                        "Listing removed.",
                        Some(keyboards::admin_p2p_menu()),
                    )
                    .await
                }
            }
        }
        _ if data.starts_with("add_listing_action_") => {
            let Some(Conversation::AdminListingAction {
                pair,
                nickname,
                price,
                limit,
            }) = ctx.conversations.get(user_id)
            else {
                return Ok(());
            };
            let action = data.trim_start_matches("add_listing_action_");
            if action != "sell" && action != "buy" {
                return Ok(());
            }
            let added = ctx
                .db
                .add_listing(&pair, &nickname, &price, &limit, action)
                .unwrap_or(false);
            if added {
                logger::info(
                    LogTag::Admin,
                    &format!("Listing added to {} by {}", pair, user_id),
                );
                edit_or_send(
                    bot,
                    chat_id,
                    message_id,
                    &format!("✅ Listing for {} added.", pair),
                    None,
                )
                .await?;
            } else {
                edit_or_send(
                    bot,
                    chat_id,
                    message_id,
                    &format!("⚠️ Pair {} no longer exists.", pair),
                    None,
                )
                .await?;
            }
            show_listing_menu(bot, ctx, chat_id, None, user_id, &pair).await
        }
        _ => {
            logger::debug(LogTag::Admin, &format!("Unknown admin callback: {}", data));
            Ok(())
        }
    }
}

/// Current listings of a pair plus the add/remove actions; also arms the
/// per-admin state carrying the selected pair.
async fn show_listing_menu(
    bot: &Bot,
    ctx: &Arc<AppContext>,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    user_id: i64,
    pair: &str,
) -> ResponseResult<()> {
    let listings = ctx.db.get_listings(pair).unwrap_or_default();

    let mut text = format!("📋 <b>Listings for {}</b>\n\n", pair);
    if listings.is_empty() {
        text.push_str("No active listings yet.");
    } else {
        for l in &listings {
            text.push_str(&format!(
                "#{} | {} | {} | {} | limit: {}\n",
                l.id, l.nickname, l.action, l.price, l.limit
            ));
        }
    }

    ctx.conversations.set(
        user_id,
        Conversation::AdminListingMenu {
            pair: pair.to_string(),
        },
    );
    edit_or_send(
        bot,
        chat_id,
        message_id,
        &text,
        Some(keyboards::admin_listing_actions_menu()),
    )
    .await
}
