//! Deal workflow: the balance-affecting state machine
//!
//! A deal is created `pending` and ends `confirmed` or `declined`, exactly
//! once. Each transition runs as a single transaction:
//!
//! - creating a withdrawal reserves (debits) the funds in the same
//!   transaction that inserts the row, so a balance can never be spent twice;
//! - admin decisions transition the status with a WHERE-guarded UPDATE whose
//!   affected-row count distinguishes the first action from a replay, which
//!   makes double-clicks harmless;
//! - a decline refunds the reservation atomically with the transition.
//!
//! Top-ups go through the same table and the same guard; they reserve
//! nothing at creation and credit on confirm.

use crate::database::models::{
    DatabaseResult, Deal, DealKind, DealStatus, DecisionOutcome, RecipientKind,
};
use crate::database::users::{apply_delta_tx, balance_tx, decimal_column};
use crate::database::Database;
use crate::errors::LedgerError;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row, Transaction};
use rust_decimal::Decimal;

impl Database {
    /// Create a withdrawal request and reserve its amount.
    ///
    /// Rejects with `InsufficientFunds` when `amount > balance` (exact
    /// equality proceeds); on success the sender is already debited and the
    /// returned deal is `pending`.
    pub fn create_withdrawal(
        &self,
        sender_id: i64,
        recipient: RecipientKind,
        address: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<Deal, LedgerError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let balance = balance_tx(&tx, sender_id)?;
        if amount > balance {
            return Err(LedgerError::InsufficientFunds {
                balance,
                requested: amount,
            });
        }
        apply_delta_tx(&tx, sender_id, -amount)?;

        let created_at = Utc::now();
        tx.execute(
            "INSERT INTO deals (kind, sender_id, recipient_address, recipient_type,
                                amount, currency, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)",
            params![
                DealKind::Withdrawal.as_str(),
                sender_id,
                address,
                recipient.as_str(),
                amount.to_string(),
                currency,
                created_at.to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Deal {
            id,
            kind: DealKind::Withdrawal,
            sender_id,
            recipient_address: Some(address.to_string()),
            recipient_type: Some(recipient),
            amount,
            currency: currency.to_string(),
            status: DealStatus::Pending,
            created_at,
        })
    }

    /// Create a top-up request. Nothing is reserved; funds move only when an
    /// administrator confirms.
    pub fn create_topup(
        &self,
        sender_id: i64,
        amount: Decimal,
        currency: &str,
    ) -> Result<Deal, LedgerError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        // The sender must exist; top-ups for unknown users make no sense
        balance_tx(&tx, sender_id)?;

        let created_at = Utc::now();
        tx.execute(
            "INSERT INTO deals (kind, sender_id, amount, currency, status, created_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
            params![
                DealKind::TopUp.as_str(),
                sender_id,
                amount.to_string(),
                currency,
                created_at.to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Deal {
            id,
            kind: DealKind::TopUp,
            sender_id,
            recipient_address: None,
            recipient_type: None,
            amount,
            currency: currency.to_string(),
            status: DealStatus::Pending,
            created_at,
        })
    }

    pub fn get_deal(&self, deal_id: i64) -> DatabaseResult<Option<Deal>> {
        let conn = self.conn.lock().unwrap();
        let deal = conn
            .query_row(
                "SELECT id, kind, sender_id, recipient_address, recipient_type,
                        amount, currency, status, created_at
                 FROM deals WHERE id = ?1",
                params![deal_id],
                map_deal,
            )
            .optional()?;
        Ok(deal)
    }

    /// Apply an admin confirm to a pending deal.
    ///
    /// Withdrawal: mark confirmed, bump the sender's deals_count, and credit
    /// the platform user owning the recipient destination when one exists.
    /// Top-up: mark confirmed and credit the requester.
    ///
    /// A deal already in a terminal state yields `AlreadyProcessed` and no
    /// mutation at all.
    pub fn confirm_deal(&self, deal_id: i64) -> Result<DecisionOutcome, LedgerError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let mut deal = load_deal_tx(&tx, deal_id)?;
        transition_tx(&tx, deal_id, DealStatus::Confirmed)?;
        deal.status = DealStatus::Confirmed;

        let outcome = match deal.kind {
            DealKind::Withdrawal => {
                tx.execute(
                    "UPDATE users SET deals_count = deals_count + 1 WHERE user_id = ?1",
                    params![deal.sender_id],
                )?;

                let counterparty = match (&deal.recipient_type, &deal.recipient_address) {
                    (Some(kind), Some(address)) => {
                        match find_destination_owner_tx(&tx, *kind, address)? {
                            Some(owner) => {
                                let credited = apply_delta_tx(&tx, owner, deal.amount)?;
                                Some((owner, credited))
                            }
                            None => None,
                        }
                    }
                    _ => None,
                };

                DecisionOutcome {
                    sender_balance: balance_tx(&tx, deal.sender_id)?,
                    counterparty,
                    deal,
                }
            }
            DealKind::TopUp => {
                let sender_balance = apply_delta_tx(&tx, deal.sender_id, deal.amount)?;
                DecisionOutcome {
                    deal,
                    sender_balance,
                    counterparty: None,
                }
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    /// Apply an admin decline to a pending deal.
    ///
    /// Withdrawal: mark declined and refund the reserved amount in the same
    /// transaction. Top-up: mark declined, nothing to refund. Terminal deals
    /// yield `AlreadyProcessed`.
    pub fn decline_deal(&self, deal_id: i64) -> Result<DecisionOutcome, LedgerError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let mut deal = load_deal_tx(&tx, deal_id)?;
        transition_tx(&tx, deal_id, DealStatus::Declined)?;
        deal.status = DealStatus::Declined;

        let sender_balance = match deal.kind {
            DealKind::Withdrawal => apply_delta_tx(&tx, deal.sender_id, deal.amount)?,
            DealKind::TopUp => balance_tx(&tx, deal.sender_id)?,
        };

        tx.commit()?;
        Ok(DecisionOutcome {
            deal,
            sender_balance,
            counterparty: None,
        })
    }
}

/// Guarded pending -> terminal transition; zero affected rows means the deal
/// was already decided.
fn transition_tx(
    tx: &Transaction<'_>,
    deal_id: i64,
    to: DealStatus,
) -> Result<(), LedgerError> {
    let changed = tx.execute(
        "UPDATE deals SET status = ?1 WHERE id = ?2 AND status = 'pending'",
        params![to.as_str(), deal_id],
    )?;
    if changed == 0 {
        return Err(LedgerError::AlreadyProcessed(deal_id));
    }
    Ok(())
}

fn load_deal_tx(tx: &Transaction<'_>, deal_id: i64) -> Result<Deal, LedgerError> {
    tx.query_row(
        "SELECT id, kind, sender_id, recipient_address, recipient_type,
                amount, currency, status, created_at
         FROM deals WHERE id = ?1",
        params![deal_id],
        map_deal,
    )
    .optional()?
    .ok_or(LedgerError::DealNotFound(deal_id))
}

fn find_destination_owner_tx(
    tx: &Transaction<'_>,
    kind: RecipientKind,
    address: &str,
) -> Result<Option<i64>, LedgerError> {
    let sql = match kind {
        RecipientKind::Wallet => {
            "SELECT user_id FROM users WHERE ton_wallet = ?1 ORDER BY user_id LIMIT 1"
        }
        RecipientKind::Card => {
            "SELECT user_id FROM users WHERE card_number = ?1 ORDER BY user_id LIMIT 1"
        }
    };
    Ok(tx
        .query_row(sql, params![address], |row| row.get(0))
        .optional()?)
}

fn map_deal(row: &Row<'_>) -> rusqlite::Result<Deal> {
    let kind_raw: String = row.get(1)?;
    let kind = DealKind::parse(&kind_raw).ok_or_else(|| bad_column(1, &kind_raw))?;

    let recipient_raw: Option<String> = row.get(4)?;
    let recipient_type = match recipient_raw {
        Some(raw) => Some(RecipientKind::parse(&raw).ok_or_else(|| bad_column(4, &raw))?),
        None => None,
    };

    let status_raw: String = row.get(7)?;
    let status = DealStatus::parse(&status_raw).ok_or_else(|| bad_column(7, &status_raw))?;

    let created_raw: String = row.get(8)?;
    let created_at = DateTime::parse_from_rfc3339(&created_raw)
        .map_err(|_| bad_column(8, &created_raw))?
        .with_timezone(&Utc);

    Ok(Deal {
        id: row.get(0)?,
        kind,
        sender_id: row.get(2)?,
        recipient_address: row.get(3)?,
        recipient_type,
        amount: decimal_column(row, 5)?,
        currency: row.get(6)?,
        status,
        created_at,
    })
}

fn bad_column(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unexpected value: {}", value).into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const WALLET: &str = "UQDoDzbmTF6UO6x9dAoKn_KvbINKptV6kHrCMqv3G4csblFh";

    fn setup_with_user(balance: i64) -> Database {
        let db = Database::open_in_memory().unwrap();
        db.register_user(1, Some("alice"), "Alice", "ru").unwrap();
        if balance > 0 {
            db.apply_delta(1, Decimal::from(balance)).unwrap();
        }
        db
    }

    fn deal_count(db: &Database) -> i64 {
        let conn = db.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM deals", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_withdrawal_reserves_funds() {
        let db = setup_with_user(100);

        let deal = db
            .create_withdrawal(1, RecipientKind::Wallet, WALLET, Decimal::from(40), "TON")
            .unwrap();

        assert_eq!(deal.status, DealStatus::Pending);
        assert_eq!(deal.amount, Decimal::from(40));
        assert_eq!(db.get_balance(1).unwrap(), Decimal::from(60));
    }

    #[test]
    fn test_withdrawal_insufficient_funds_is_clean() {
        let db = setup_with_user(10);

        let err = db
            .create_withdrawal(1, RecipientKind::Wallet, WALLET, Decimal::from(40), "TON")
            .unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(db.get_balance(1).unwrap(), Decimal::from(10));
        assert_eq!(deal_count(&db), 0);
    }

    #[test]
    fn test_withdrawal_exact_balance_proceeds() {
        let db = setup_with_user(40);
        db.create_withdrawal(1, RecipientKind::Wallet, WALLET, Decimal::from(40), "TON")
            .unwrap();
        assert_eq!(db.get_balance(1).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_confirm_is_idempotent() {
        let db = setup_with_user(100);
        let deal = db
            .create_withdrawal(1, RecipientKind::Wallet, WALLET, Decimal::from(40), "TON")
            .unwrap();

        let outcome = db.confirm_deal(deal.id).unwrap();
        assert_eq!(outcome.deal.status, DealStatus::Confirmed);
        // Funds were already reserved at creation; confirm does not re-debit
        assert_eq!(outcome.sender_balance, Decimal::from(60));
        assert_eq!(db.get_user(1).unwrap().unwrap().deals_count, 1);

        // Second confirm is a reported no-op
        let err = db.confirm_deal(deal.id).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyProcessed(_)));
        assert_eq!(db.get_balance(1).unwrap(), Decimal::from(60));
        assert_eq!(db.get_user(1).unwrap().unwrap().deals_count, 1);
        assert_eq!(
            db.get_deal(deal.id).unwrap().unwrap().status,
            DealStatus::Confirmed
        );
    }

    #[test]
    fn test_decline_refunds_exactly_once() {
        let db = setup_with_user(100);
        let deal = db
            .create_withdrawal(
                1,
                RecipientKind::Wallet,
                WALLET,
                Decimal::from_str("40.50").unwrap(),
                "TON",
            )
            .unwrap();
        assert_eq!(
            db.get_balance(1).unwrap(),
            Decimal::from_str("59.50").unwrap()
        );

        let outcome = db.decline_deal(deal.id).unwrap();
        assert_eq!(outcome.deal.status, DealStatus::Declined);
        assert_eq!(outcome.sender_balance, Decimal::from(100));

        // Replay does not refund again
        let err = db.decline_deal(deal.id).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyProcessed(_)));
        assert_eq!(db.get_balance(1).unwrap(), Decimal::from(100));
    }

    #[test]
    fn test_confirm_after_decline_is_rejected() {
        let db = setup_with_user(100);
        let deal = db
            .create_withdrawal(1, RecipientKind::Wallet, WALLET, Decimal::from(40), "TON")
            .unwrap();

        db.decline_deal(deal.id).unwrap();
        let err = db.confirm_deal(deal.id).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyProcessed(_)));
        // The refund stands; no credit or count bump happened
        assert_eq!(db.get_balance(1).unwrap(), Decimal::from(100));
        assert_eq!(db.get_user(1).unwrap().unwrap().deals_count, 0);
    }

    #[test]
    fn test_confirm_credits_matching_destination_owner() {
        let db = setup_with_user(100);
        db.register_user(2, Some("bob"), "Bob", "ru").unwrap();
        db.set_wallet(2, WALLET).unwrap();

        let deal = db
            .create_withdrawal(1, RecipientKind::Wallet, WALLET, Decimal::from(40), "TON")
            .unwrap();
        let outcome = db.confirm_deal(deal.id).unwrap();

        assert_eq!(outcome.counterparty, Some((2, Decimal::from(40))));
        assert_eq!(db.get_balance(2).unwrap(), Decimal::from(40));
    }

    #[test]
    fn test_confirm_without_matching_destination() {
        let db = setup_with_user(100);
        let deal = db
            .create_withdrawal(1, RecipientKind::Wallet, WALLET, Decimal::from(40), "TON")
            .unwrap();
        let outcome = db.confirm_deal(deal.id).unwrap();
        assert_eq!(outcome.counterparty, None);
    }

    #[test]
    fn test_topup_never_debits_at_creation() {
        let db = setup_with_user(0);

        let deal = db.create_topup(1, Decimal::from(25), "TON").unwrap();
        assert_eq!(deal.status, DealStatus::Pending);
        assert_eq!(db.get_balance(1).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_topup_confirm_credits_once() {
        let db = setup_with_user(0);
        let deal = db.create_topup(1, Decimal::from(25), "TON").unwrap();

        let outcome = db.confirm_deal(deal.id).unwrap();
        assert_eq!(outcome.sender_balance, Decimal::from(25));
        assert_eq!(db.get_balance(1).unwrap(), Decimal::from(25));
        // Top-ups do not count as completed deals
        assert_eq!(db.get_user(1).unwrap().unwrap().deals_count, 0);

        let err = db.confirm_deal(deal.id).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyProcessed(_)));
        assert_eq!(db.get_balance(1).unwrap(), Decimal::from(25));
    }

    #[test]
    fn test_topup_decline_leaves_balance_untouched() {
        let db = setup_with_user(0);
        let deal = db.create_topup(1, Decimal::from(25), "TON").unwrap();

        let outcome = db.decline_deal(deal.id).unwrap();
        assert_eq!(outcome.sender_balance, Decimal::ZERO);
        assert_eq!(db.get_balance(1).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_decide_unknown_deal() {
        let db = setup_with_user(0);
        assert!(matches!(
            db.confirm_deal(404),
            Err(LedgerError::DealNotFound(404))
        ));
        assert!(matches!(
            db.decline_deal(404),
            Err(LedgerError::DealNotFound(404))
        ));
    }
}
