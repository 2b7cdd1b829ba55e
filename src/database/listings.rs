//! Currency pairs and P2P listings
//!
//! Plain CRUD, administrator-only on the write side. Removing a pair
//! cascades to its listings through the foreign key.

use crate::database::models::{DatabaseResult, Listing, Pair};
use crate::database::Database;
use rusqlite::{params, OptionalExtension};

impl Database {
    /// Add a currency pair; names are stored upper-case and unique.
    /// Returns false when the pair already exists.
    pub fn add_pair(&self, name: &str) -> DatabaseResult<bool> {
        let name = name.to_uppercase();
        let conn = self.conn.lock().unwrap();
        match conn.execute("INSERT INTO p2p_pairs (name) VALUES (?1)", params![name]) {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a pair and, via cascade, all its listings.
    /// Returns false when no such pair existed.
    pub fn remove_pair(&self, name: &str) -> DatabaseResult<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "DELETE FROM p2p_pairs WHERE name = ?1",
            params![name.to_uppercase()],
        )?;
        Ok(changed > 0)
    }

    pub fn get_all_pairs(&self) -> DatabaseResult<Vec<Pair>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, name FROM p2p_pairs ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Pair {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        let mut pairs = Vec::new();
        for pair in rows {
            pairs.push(pair?);
        }
        Ok(pairs)
    }

    /// Add a listing under a pair. Returns false when the pair is unknown.
    pub fn add_listing(
        &self,
        pair_name: &str,
        nickname: &str,
        price: &str,
        limit: &str,
        action: &str,
    ) -> DatabaseResult<bool> {
        let conn = self.conn.lock().unwrap();
        let pair_id: Option<i64> = conn
            .query_row(
                "SELECT id FROM p2p_pairs WHERE name = ?1",
                params![pair_name.to_uppercase()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(pair_id) = pair_id else {
            return Ok(false);
        };

        conn.execute(
            r#"INSERT INTO p2p_listings (pair_id, nickname, price, "limit", action)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![pair_id, nickname, price, limit, action],
        )?;
        Ok(true)
    }

    /// Remove a listing by id. Returns false when no such listing existed.
    pub fn remove_listing(&self, listing_id: i64) -> DatabaseResult<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "DELETE FROM p2p_listings WHERE id = ?1",
            params![listing_id],
        )?;
        Ok(changed > 0)
    }

    /// All listings of a pair, by pair name
    pub fn get_listings(&self, pair_name: &str) -> DatabaseResult<Vec<Listing>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"SELECT l.id, l.pair_id, l.nickname, l.price, l."limit", l.action
               FROM p2p_listings l
               JOIN p2p_pairs p ON l.pair_id = p.id
               WHERE p.name = ?1
               ORDER BY l.id"#,
        )?;
        let rows = stmt.query_map(params![pair_name.to_uppercase()], |row| {
            Ok(Listing {
                id: row.get(0)?,
                pair_id: row.get(1)?,
                nickname: row.get(2)?,
                price: row.get(3)?,
                limit: row.get(4)?,
                action: row.get(5)?,
            })
        })?;

        let mut listings = Vec::new();
        for listing in rows {
            listings.push(listing?);
        }
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_pair_names_normalized_and_unique() {
        let db = setup();
        assert!(db.add_pair("ton_rub").unwrap());
        assert!(!db.add_pair("TON_RUB").unwrap());

        let pairs = db.get_all_pairs().unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].name, "TON_RUB");
    }

    #[test]
    fn test_listing_crud() {
        let db = setup();
        db.add_pair("TON_RUB").unwrap();

        assert!(db
            .add_listing("ton_rub", "trader1", "4.40$", "10 TON", "sell")
            .unwrap());
        assert!(!db
            .add_listing("BTC_USD", "trader1", "1", "1", "buy")
            .unwrap());

        let listings = db.get_listings("TON_RUB").unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].nickname, "trader1");
        assert_eq!(listings[0].limit, "10 TON");

        assert!(db.remove_listing(listings[0].id).unwrap());
        assert!(!db.remove_listing(listings[0].id).unwrap());
        assert!(db.get_listings("TON_RUB").unwrap().is_empty());
    }

    #[test]
    fn test_pair_removal_cascades() {
        let db = setup();
        db.add_pair("TON_RUB").unwrap();
        db.add_listing("TON_RUB", "trader1", "4.40$", "10 TON", "sell")
            .unwrap();
        db.add_listing("TON_RUB", "trader2", "4.45$", "50 TON", "buy")
            .unwrap();

        assert!(db.remove_pair("TON_RUB").unwrap());
        assert!(db.get_listings("TON_RUB").unwrap().is_empty());
        assert!(db.get_all_pairs().unwrap().is_empty());
    }
}
