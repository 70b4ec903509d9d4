//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerError::Storage (fulfil-engine)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller decides: retry on Conflict, report everything else             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

/// SQLite primary and extended result codes that mean "another writer got
/// there first": BUSY, LOCKED, BUSY_RECOVERY, LOCKED_SHAREDCACHE,
/// BUSY_SNAPSHOT.
const SQLITE_CONTENTION_CODES: &[&str] = &["5", "6", "261", "262", "517"];

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate SKU or raw material name
    /// - Duplicate document number (sequence backstop)
    /// - Duplicate batch number for a product
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative batch stock, priority range).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// Lost a race with a concurrent writer. Safe to retry the operation.
    ///
    /// ## When This Occurs
    /// - SQLITE_BUSY / SQLITE_LOCKED after the busy timeout
    /// - A guarded UPDATE matched no row because a concurrent writer
    ///   changed it first
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// Stored data could not be decoded into a domain value.
    #[error("Corrupt {field}: {value}")]
    DataCorruption { field: String, value: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a Conflict error for a guarded update that matched no row.
    pub fn stale(entity: &str, id: impl ToString) -> Self {
        DbError::Conflict(format!("{} {} was modified concurrently", entity, id.to_string()))
    }

    /// True for errors that a caller may resolve by retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Conflict(_) | DbError::PoolExhausted)
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → constraint type, or Conflict for busy/locked
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::ColumnDecode   → DbError::DataCorruption
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code();

                if code
                    .as_deref()
                    .is_some_and(|c| SQLITE_CONTENTION_CODES.contains(&c))
                    || msg.contains("database is locked")
                {
                    DbError::Conflict(msg.to_string())
                } else if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::ColumnDecode { index, source } => DbError::DataCorruption {
                field: index,
                value: source.to_string(),
            },

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Parses a decimal stored as TEXT.
pub(crate) fn parse_decimal(field: &str, value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value).map_err(|_| DbError::DataCorruption {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Narrows a stored priority to `u8`.
pub(crate) fn parse_priority(value: i64) -> DbResult<u8> {
    u8::try_from(value).map_err(|_| DbError::DataCorruption {
        field: "priority".to_string(),
        value: value.to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("amount", "1234.5625").unwrap(), dec!(1234.5625));
        assert!(matches!(
            parse_decimal("amount", "12,5"),
            Err(DbError::DataCorruption { .. })
        ));
    }

    #[test]
    fn test_parse_priority() {
        assert_eq!(parse_priority(7).unwrap(), 7);
        assert!(parse_priority(300).is_err());
    }

    #[test]
    fn test_retryable() {
        assert!(DbError::Conflict("locked".to_string()).is_retryable());
        assert!(DbError::stale("ProductBatch", 3).is_retryable());
        assert!(!DbError::not_found("Invoice", 1).is_retryable());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
