use crate::Database;
use anyhow::Result;

impl Database {
    // -- Accounts --

    /// Bind `identity` to `address`, replacing any previous address.
    pub fn upsert_account(&self, identity: &str, address: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO accounts (identity, address) VALUES (?1, ?2)
                 ON CONFLICT(identity) DO UPDATE
                 SET address = excluded.address, updated_at = datetime('now')",
                (identity, address),
            )?;
            Ok(())
        })
    }

    pub fn get_address(&self, identity: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT address FROM accounts WHERE identity = ?1 LIMIT 1",
                [identity],
                |row| row.get(0),
            )
            .optional()
        })
    }
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(db: &Database) -> i64 {
        db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?))
            .unwrap()
    }

    #[test]
    fn unknown_identity_has_no_address() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_address("U404").unwrap(), None);
    }

    #[test]
    fn upsert_then_resolve() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_account("U1", "0xabc").unwrap();
        assert_eq!(db.get_address("U1").unwrap().as_deref(), Some("0xabc"));
    }

    #[test]
    fn upsert_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_account("U1", "0xabc").unwrap();
        db.upsert_account("U1", "0xabc").unwrap();
        assert_eq!(count(&db), 1);
    }

    #[test]
    fn reregister_replaces_address() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_account("U1", "0xaaa").unwrap();
        db.upsert_account("U2", "0xccc").unwrap();
        db.upsert_account("U1", "0xbbb").unwrap();

        assert_eq!(db.get_address("U1").unwrap().as_deref(), Some("0xbbb"));
        assert_eq!(db.get_address("U2").unwrap().as_deref(), Some("0xccc"));
        assert_eq!(count(&db), 2);

        let (created, updated): (String, String) = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT created_at, updated_at FROM accounts WHERE identity = 'U1'",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?)
            })
            .unwrap();
        assert!(updated >= created);
    }

    #[test]
    fn connect_accepts_memory_url() {
        let db = Database::connect("sqlite::memory:").unwrap();
        assert_eq!(count(&db), 0);
        assert!(Database::connect("sqlite://").is_err());
    }
}
