//! Row types shared by the database modules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Result wrapper for plain database operations
pub type DatabaseResult<T> = anyhow::Result<T>;

/// A registered bot user
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: i64,
    pub username: Option<String>,
    pub full_name: String,
    pub ton_wallet: Option<String>,
    pub card_number: Option<String>,
    pub language: String,
    pub balance: Decimal,
    pub deals_count: i64,
    pub ref_count: i64,
}

/// An administrator-curated currency pair ("TON_RUB")
#[derive(Debug, Clone)]
pub struct Pair {
    pub id: i64,
    pub name: String,
}

/// A buy/sell advertisement inside a pair, read-only to end users
#[derive(Debug, Clone)]
pub struct Listing {
    pub id: i64,
    pub pair_id: i64,
    pub nickname: String,
    pub price: String,
    pub limit: String,
    pub action: String,
}

/// Whether a deal moves funds out (withdrawal) or in (top-up)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealKind {
    Withdrawal,
    TopUp,
}

impl DealKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealKind::Withdrawal => "withdrawal",
            DealKind::TopUp => "topup",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "withdrawal" => Some(DealKind::Withdrawal),
            "topup" => Some(DealKind::TopUp),
            _ => None,
        }
    }
}

/// Payout destination kind for a withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientKind {
    Wallet,
    Card,
}

impl RecipientKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientKind::Wallet => "wallet",
            RecipientKind::Card => "card",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wallet" => Some(RecipientKind::Wallet),
            "card" => Some(RecipientKind::Card),
            _ => None,
        }
    }
}

/// Lifecycle of a deal: pending until exactly one admin decision lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealStatus {
    Pending,
    Confirmed,
    Declined,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::Pending => "pending",
            DealStatus::Confirmed => "confirmed",
            DealStatus::Declined => "declined",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DealStatus::Pending),
            "confirmed" => Some(DealStatus::Confirmed),
            "declined" => Some(DealStatus::Declined),
            _ => None,
        }
    }
}

/// A money-movement request awaiting or past admin decision
#[derive(Debug, Clone)]
pub struct Deal {
    pub id: i64,
    pub kind: DealKind,
    pub sender_id: i64,
    pub recipient_address: Option<String>,
    pub recipient_type: Option<RecipientKind>,
    pub amount: Decimal,
    pub currency: String,
    pub status: DealStatus,
    pub created_at: DateTime<Utc>,
}

/// Result of applying an admin decision to a deal.
///
/// Carries everything the notification layer needs, so notifications can be
/// composed after the transaction has committed.
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub deal: Deal,
    /// Sender's balance after the decision was applied
    pub sender_balance: Decimal,
    /// For confirmed withdrawals: the platform user whose stored destination
    /// matched the recipient address, with their balance after the credit
    pub counterparty: Option<(i64, Decimal)>,
}
