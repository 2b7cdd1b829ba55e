//! Inline keyboard builders
//!
//! Pre-built keyboard layouts for menu navigation, the deal/top-up flows and
//! the admin panel. User-facing labels come from the message catalog; the
//! admin surface uses fixed labels.

use crate::database::models::{Listing, Pair};
use crate::locales::Translator;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Create a callback button
fn btn(text: &str, callback_data: &str) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text.to_string(), callback_data.to_string())
}

// === USER MENUS ===

/// Main menu shown on /start and "back to main"
pub fn main_menu(t: &Translator, lang: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![btn(&t.button(lang, "profile"), "profile")],
        vec![btn(&t.button(lang, "create_deal"), "create_deal")],
        vec![btn(&t.button(lang, "p2p"), "p2p")],
        vec![btn(&t.button(lang, "change_language"), "change_language")],
    ])
}

/// Single "register" button for unregistered users
pub fn register_menu(t: &Translator, lang: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![btn(
        &t.button(lang, "start_registration"),
        "register",
    )]])
}

/// Offered while the user is typing a registration name
pub fn registration_name_menu(t: &Translator, lang: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![btn(
        &t.button(lang, "use_profile_name"),
        "use_profile_name",
    )]])
}

pub fn profile_menu(t: &Translator, lang: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![btn(&t.button(lang, "add_wallet"), "add_change_wallet")],
        vec![btn(&t.button(lang, "top_up_wallet"), "top_up_wallet")],
        vec![btn(&t.button(lang, "ref_link"), "ref_link")],
        vec![btn(&t.button(lang, "back"), "back_to_main")],
    ])
}

/// Wallet-or-card chooser on the profile screen
pub fn wallet_type_menu(t: &Translator, lang: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![btn(&t.button(lang, "add_ton_wallet"), "add_ton_wallet")],
        vec![btn(&t.button(lang, "add_card"), "add_card")],
        vec![btn(&t.button(lang, "back"), "back_to_main")],
    ])
}

/// A lone back button to an arbitrary callback target
pub fn back_to(t: &Translator, lang: &str, target: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![btn(&t.button(lang, "back"), target)]])
}

pub fn language_menu(t: &Translator, lang: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            btn(&t.button(lang, "english"), "set_english"),
            btn(&t.button(lang, "russian"), "set_russian"),
        ],
        vec![btn(&t.button(lang, "back"), "back_to_main")],
    ])
}

/// One button per currency pair ("TON <> RUB"), plus back
pub fn p2p_pairs_menu(t: &Translator, lang: &str, pairs: &[Pair]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = pairs
        .iter()
        .map(|pair| {
            vec![btn(
                &pair.name.replace('_', " <> "),
                &format!("p2p_{}", pair.name),
            )]
        })
        .collect();
    rows.push(vec![btn(&t.button(lang, "back"), "back_to_main")]);
    InlineKeyboardMarkup::new(rows)
}

// === DEAL FLOW ===

/// Recipient-type chooser when creating a deal
pub fn deal_recipient_menu(t: &Translator, lang: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![btn(
            &t.button(lang, "add_ton_wallet"),
            "add_recipient_ton_wallet",
        )],
        vec![btn(&t.button(lang, "add_card"), "add_recipient_card")],
        vec![btn(&t.button(lang, "back"), "back_to_main")],
    ])
}

/// Final confirm/cancel pair on the deal summary
pub fn deal_confirm_menu(t: &Translator, lang: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        btn(&t.button(lang, "p2p_confirm"), "confirm_deal"),
        btn(&t.button(lang, "p2p_decline"), "decline_deal"),
    ]])
}

/// Confirm/cancel pair on the top-up summary
pub fn topup_confirm_menu(t: &Translator, lang: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        btn(&t.button(lang, "confirm_top_up"), "confirm_top_up"),
        btn(&t.button(lang, "cancel_top_up"), "cancel_top_up"),
    ]])
}

pub fn back_to_main(t: &Translator, lang: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![btn(
        &t.button(lang, "back_to_main"),
        "back_to_main",
    )]])
}

// === ADMIN SURFACE ===

/// Confirm/decline actions bound to a pending deal, sent to admin groups
pub fn admin_decision_menu(deal_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        btn("✅ Confirm", &format!("admin_confirm_deal:{}", deal_id)),
        btn("❌ Decline", &format!("admin_decline_deal:{}", deal_id)),
    ]])
}

pub fn admin_panel_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![btn("📊 Manage P2P", "admin_p2p_manage")]])
}

pub fn admin_p2p_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            btn("➕ Add pair", "admin_p2p_add_pair"),
            btn("➖ Remove pair", "admin_p2p_remove_pair"),
        ],
        vec![btn("📋 Manage listings", "admin_p2p_manage_listings")],
        vec![btn("⬅️ Back to admin panel", "back_to_admin_panel")],
    ])
}

/// One button per pair, each carrying `prefix` + pair name
pub fn admin_pairs_menu(pairs: &[Pair], prefix: &str, back: &str) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = pairs
        .iter()
        .map(|pair| vec![btn(&pair.name, &format!("{}{}", prefix, pair.name))])
        .collect();
    rows.push(vec![btn("⬅️ Back", back)]);
    InlineKeyboardMarkup::new(rows)
}

/// Add/remove listing actions for a selected pair
pub fn admin_listing_actions_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            btn("➕ Add listing", "add_listing_start"),
            btn("➖ Remove listing", "remove_listing_start"),
        ],
        vec![btn("⬅️ Choose another pair", "admin_p2p_manage_listings")],
    ])
}

/// Buy/sell chooser for the last listing-entry step
pub fn admin_listing_action_pick_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        btn("Sell", "add_listing_action_sell"),
        btn("Buy", "add_listing_action_buy"),
    ]])
}

/// One delete button per listing of a pair
pub fn admin_listings_remove_menu(listings: &[Listing], back: &str) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = listings
        .iter()
        .map(|l| {
            vec![btn(
                &format!("❌ #{} ({})", l.id, l.nickname),
                &format!("confirm_remove_listing_{}", l.id),
            )]
        })
        .collect();
    rows.push(vec![btn("⬅️ Back", back)]);
    InlineKeyboardMarkup::new(rows)
}
