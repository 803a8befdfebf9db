//! Persistence queries
//!
//! Ids are stored as hyphenated UUID text. Functions that take part in a
//! multi-row write accept `&mut SqliteConnection` so callers can run them
//! inside one transaction; read-only lookups take the pool. Transactions
//! that read before they write start with [`begin_write`].

pub mod achievements;
pub mod badges;
pub mod courses;
pub mod enrollments;
pub mod users;

use learnsmart_common::{Error, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

/// Begin a transaction holding the write lock from its first statement
///
/// A deferred transaction that reads first cannot wait for a concurrent
/// writer in WAL mode; its write fails with `SQLITE_BUSY` instead.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Parse a stored id column
pub(crate) fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::Internal(format!("Corrupt id '{}': {}", raw, e)))
}
