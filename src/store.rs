use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::models::{StoredDeal, ValidatedDeal};

/// Why an insert was refused by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertError {
    /// The unique-key constraint fired; the deal already exists.
    Duplicate,
    Other(String),
}

/// Capability the import pipeline needs from the persistent store: an
/// existence check by unique key and insert-if-absent. The store's uniqueness
/// constraint is authoritative; `exists_by_key` is only the cheap pre-check.
pub trait DealStore {
    fn exists_by_key(&self, deal_unique_id: &str) -> Result<bool, String>;

    fn insert(
        &mut self,
        deal: ValidatedDeal,
        created_at: DateTime<Utc>,
    ) -> Result<StoredDeal, InsertError>;
}

/// SQLite-backed store over the `deals` table.
pub struct SqliteDealStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteDealStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl DealStore for SqliteDealStore<'_> {
    fn exists_by_key(&self, deal_unique_id: &str) -> Result<bool, String> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT 1 FROM deals WHERE deal_unique_id = ?1")
            .map_err(|e| e.to_string())?;
        stmt.exists([deal_unique_id]).map_err(|e| e.to_string())
    }

    fn insert(
        &mut self,
        deal: ValidatedDeal,
        created_at: DateTime<Utc>,
    ) -> Result<StoredDeal, InsertError> {
        let result = self.conn.execute(
            "INSERT INTO deals (deal_unique_id, from_currency, to_currency, deal_timestamp, deal_amount, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                deal.deal_unique_id,
                deal.from_currency,
                deal.to_currency,
                deal.timestamp.to_rfc3339(),
                deal.amount.to_string(),
                created_at.to_rfc3339(),
            ],
        );
        match result {
            Ok(_) => Ok(StoredDeal {
                id: self.conn.last_insert_rowid(),
                deal_unique_id: deal.deal_unique_id,
                from_currency: deal.from_currency,
                to_currency: deal.to_currency,
                timestamp: deal.timestamp,
                amount: deal.amount,
                created_at,
            }),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(InsertError::Duplicate)
            }
            Err(other) => Err(InsertError::Other(other.to_string())),
        }
    }
}
