//! User records, the balance ledger and VIP balance grants
//!
//! Balance mutations are the only money-critical writes in the bot. Every
//! read-then-write here happens inside a transaction while the connection
//! lock is held, and a debit that would go negative aborts without touching
//! the row.

use crate::database::models::{DatabaseResult, RecipientKind, User};
use crate::database::Database;
use crate::errors::LedgerError;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension, Transaction};
use rust_decimal::Decimal;
use std::str::FromStr;

impl Database {
    /// Register a user if not already present. Returns true when a new row
    /// was created.
    pub fn register_user(
        &self,
        user_id: i64,
        username: Option<&str>,
        full_name: &str,
        language: &str,
    ) -> DatabaseResult<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "INSERT OR IGNORE INTO users (user_id, username, full_name, language)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, username, full_name, language],
        )?;
        Ok(changed > 0)
    }

    pub fn get_user(&self, user_id: i64) -> DatabaseResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                "SELECT user_id, username, full_name, ton_wallet, card_number,
                        language, balance, deals_count, ref_count
                 FROM users WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(User {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                        full_name: row.get(2)?,
                        ton_wallet: row.get(3)?,
                        card_number: row.get(4)?,
                        language: row.get(5)?,
                        balance: decimal_column(row, 6)?,
                        deals_count: row.get(7)?,
                        ref_count: row.get(8)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    pub fn user_exists(&self, user_id: i64) -> DatabaseResult<bool> {
        let conn = self.conn.lock().unwrap();
        let found = conn
            .query_row(
                "SELECT 1 FROM users WHERE user_id = ?1",
                params![user_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Language of a user, or None when unregistered
    pub fn get_language(&self, user_id: i64) -> DatabaseResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let lang = conn
            .query_row(
                "SELECT language FROM users WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(lang)
    }

    pub fn set_language(&self, user_id: i64, language: &str) -> DatabaseResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET language = ?1 WHERE user_id = ?2",
            params![language, user_id],
        )?;
        Ok(())
    }

    pub fn set_wallet(&self, user_id: i64, wallet: &str) -> DatabaseResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET ton_wallet = ?1 WHERE user_id = ?2",
            params![wallet, user_id],
        )?;
        Ok(())
    }

    pub fn set_card(&self, user_id: i64, card: &str) -> DatabaseResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET card_number = ?1 WHERE user_id = ?2",
            params![card, user_id],
        )?;
        Ok(())
    }

    pub fn increment_ref_count(&self, user_id: i64) -> DatabaseResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET ref_count = ref_count + 1 WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(())
    }

    // --- Balance ledger ---

    /// Current balance of an existing user
    pub fn get_balance(&self, user_id: i64) -> Result<Decimal, LedgerError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let balance = balance_tx(&tx, user_id)?;
        tx.commit()?;
        Ok(balance)
    }

    /// Apply a signed delta to a user's balance.
    ///
    /// Rejects with `InsufficientFunds` (and no mutation) when the result
    /// would be negative. Returns the new balance.
    pub fn apply_delta(&self, user_id: i64, delta: Decimal) -> Result<Decimal, LedgerError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let new_balance = apply_delta_tx(&tx, user_id, delta)?;
        tx.commit()?;
        Ok(new_balance)
    }

    /// Absolute set, admin profile-edit path. Any non-negative value.
    pub fn set_balance(&self, user_id: i64, amount: Decimal) -> Result<(), LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::InsufficientFunds {
                balance: Decimal::ZERO,
                requested: amount.abs(),
            });
        }
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE users SET balance = ?1 WHERE user_id = ?2",
            params![amount.to_string(), user_id],
        )?;
        if changed == 0 {
            return Err(LedgerError::UserNotFound(user_id));
        }
        Ok(())
    }

    /// Look up the platform user owning a payout destination, via the
    /// wallet/card indexes. First match wins; see DESIGN.md on duplicate
    /// destinations.
    pub fn find_user_by_destination(
        &self,
        kind: RecipientKind,
        address: &str,
    ) -> DatabaseResult<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        let sql = match kind {
            RecipientKind::Wallet => {
                "SELECT user_id FROM users WHERE ton_wallet = ?1 ORDER BY user_id LIMIT 1"
            }
            RecipientKind::Card => {
                "SELECT user_id FROM users WHERE card_number = ?1 ORDER BY user_id LIMIT 1"
            }
        };
        let found = conn
            .query_row(sql, params![address], |row| row.get(0))
            .optional()?;
        Ok(found)
    }

    // --- VIP balance grants ---

    /// Grant the user the right to self-mutate balance for `days` days.
    /// Returns the expiry timestamp.
    pub fn grant_balance_permission(
        &self,
        user_id: i64,
        days: i64,
    ) -> DatabaseResult<DateTime<Utc>> {
        let expires_at = Utc::now() + Duration::days(days);
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO balance_grants (user_id, expires_at) VALUES (?1, ?2)",
            params![user_id, expires_at.to_rfc3339()],
        )?;
        Ok(expires_at)
    }

    /// Revoke a grant. Returns true when one existed.
    pub fn revoke_balance_permission(&self, user_id: i64) -> DatabaseResult<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "DELETE FROM balance_grants WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(changed > 0)
    }

    /// Check for an unexpired grant; expired rows are removed on the way.
    pub fn has_balance_permission(&self, user_id: i64) -> DatabaseResult<bool> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM balance_grants WHERE user_id = ?1 AND expires_at <= ?2",
            params![user_id, Utc::now().to_rfc3339()],
        )?;
        let found = conn
            .query_row(
                "SELECT 1 FROM balance_grants WHERE user_id = ?1",
                params![user_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

/// Read a TEXT column as a Decimal inside a row-mapping closure
pub(crate) fn decimal_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Read a user's balance inside an open transaction
pub(crate) fn balance_tx(tx: &Transaction<'_>, user_id: i64) -> Result<Decimal, LedgerError> {
    let raw: Option<String> = tx
        .query_row(
            "SELECT balance FROM users WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    let raw = raw.ok_or(LedgerError::UserNotFound(user_id))?;
    Decimal::from_str(&raw).map_err(|_| LedgerError::MalformedAmount(raw))
}

/// Apply a signed delta inside an open transaction; the caller commits.
pub(crate) fn apply_delta_tx(
    tx: &Transaction<'_>,
    user_id: i64,
    delta: Decimal,
) -> Result<Decimal, LedgerError> {
    let balance = balance_tx(tx, user_id)?;
    let new_balance = balance + delta;
    if new_balance < Decimal::ZERO {
        return Err(LedgerError::InsufficientFunds {
            balance,
            requested: delta.abs(),
        });
    }
    tx.execute(
        "UPDATE users SET balance = ?1 WHERE user_id = ?2",
        params![new_balance.to_string(), user_id],
    )?;
    Ok(new_balance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_register_defaults() {
        let db = setup();
        assert!(db.register_user(1, Some("alice"), "Alice", "en").unwrap());
        // Second registration is a no-op
        assert!(!db.register_user(1, Some("alice"), "Alice", "en").unwrap());

        let user = db.get_user(1).unwrap().unwrap();
        assert_eq!(user.balance, Decimal::ZERO);
        assert_eq!(user.deals_count, 0);
        assert_eq!(user.ref_count, 0);
        assert_eq!(user.language, "en");
        assert!(user.ton_wallet.is_none());
    }

    #[test]
    fn test_apply_delta_and_floor() {
        let db = setup();
        db.register_user(1, None, "Alice", "ru").unwrap();

        let b = db.apply_delta(1, Decimal::from(100)).unwrap();
        assert_eq!(b, Decimal::from(100));

        let b = db.apply_delta(1, Decimal::from(-40)).unwrap();
        assert_eq!(b, Decimal::from(60));

        // Over-debit is rejected without mutation
        let err = db.apply_delta(1, Decimal::from(-61)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(db.get_balance(1).unwrap(), Decimal::from(60));

        // Debit to exactly zero is allowed
        let b = db.apply_delta(1, Decimal::from(-60)).unwrap();
        assert_eq!(b, Decimal::ZERO);
    }

    #[test]
    fn test_apply_delta_unknown_user() {
        let db = setup();
        assert!(matches!(
            db.apply_delta(99, Decimal::from(1)),
            Err(LedgerError::UserNotFound(99))
        ));
    }

    #[test]
    fn test_set_balance() {
        let db = setup();
        db.register_user(1, None, "Alice", "ru").unwrap();
        db.set_balance(1, Decimal::from_str("12.50").unwrap())
            .unwrap();
        assert_eq!(
            db.get_balance(1).unwrap(),
            Decimal::from_str("12.50").unwrap()
        );
        assert!(db.set_balance(1, Decimal::from(-1)).is_err());
        assert!(matches!(
            db.set_balance(2, Decimal::ZERO),
            Err(LedgerError::UserNotFound(2))
        ));
    }

    #[test]
    fn test_fractional_amounts_survive_round_trip() {
        let db = setup();
        db.register_user(1, None, "Alice", "ru").unwrap();
        db.apply_delta(1, Decimal::from_str("0.05").unwrap())
            .unwrap();
        db.apply_delta(1, Decimal::from_str("10.20").unwrap())
            .unwrap();
        assert_eq!(
            db.get_balance(1).unwrap(),
            Decimal::from_str("10.25").unwrap()
        );
    }

    #[test]
    fn test_find_user_by_destination() {
        let db = setup();
        db.register_user(1, None, "Alice", "ru").unwrap();
        db.register_user(2, None, "Bob", "ru").unwrap();
        let wallet = "w".repeat(48);
        db.set_wallet(2, &wallet).unwrap();
        db.set_card(1, "1234567890123456").unwrap();

        assert_eq!(
            db.find_user_by_destination(RecipientKind::Wallet, &wallet)
                .unwrap(),
            Some(2)
        );
        assert_eq!(
            db.find_user_by_destination(RecipientKind::Card, "1234567890123456")
                .unwrap(),
            Some(1)
        );
        assert_eq!(
            db.find_user_by_destination(RecipientKind::Card, "0000000000000000")
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_balance_grants() {
        let db = setup();
        db.register_user(1, None, "Alice", "ru").unwrap();

        assert!(!db.has_balance_permission(1).unwrap());
        db.grant_balance_permission(1, 7).unwrap();
        assert!(db.has_balance_permission(1).unwrap());
        assert!(db.revoke_balance_permission(1).unwrap());
        assert!(!db.has_balance_permission(1).unwrap());

        // An already-expired grant does not authorize
        db.grant_balance_permission(1, -1).unwrap();
        assert!(!db.has_balance_permission(1).unwrap());
    }
}
