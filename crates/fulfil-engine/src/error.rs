//! # Ledger Error Type
//!
//! Unified error type returned by every [`Ledger`](crate::Ledger) operation.
//!
//! ## Error Families
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in a Ledger Operation                     │
//! │                                                                         │
//! │  begin tx                                                               │
//! │     │                                                                   │
//! │     ├── rule check fails ─── CoreError ──────► LedgerError::Domain      │
//! │     │     (Validation, NotFound, StateConflict,                         │
//! │     │      Overpayment, InsufficientMaterial)                           │
//! │     │                                                                   │
//! │     ├── query fails ──────── DbError ────────► LedgerError::Storage     │
//! │     │     (Conflict is retryable)                                       │
//! │     │                                                                   │
//! │     └── commit                                                          │
//! │                                                                         │
//! │  Either error drops the transaction, which rolls back every write.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use fulfil_core::{CoreError, ValidationError};
use fulfil_db::DbError;
use thiserror::Error;

/// Error from a ledger operation.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The store failed or lost a race.
    #[error(transparent)]
    Storage(#[from] DbError),
}

/// Machine-readable error codes for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    StateConflict,
    Overpayment,
    InsufficientMaterial,
    /// Concurrent write; retry the whole operation.
    Conflict,
    DatabaseError,
}

impl LedgerError {
    /// True when retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Storage(e) => e.is_retryable(),
            LedgerError::Domain(_) => false,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::Domain(CoreError::Validation(_)) => ErrorCode::ValidationError,
            LedgerError::Domain(CoreError::NotFound { .. }) => ErrorCode::NotFound,
            LedgerError::Domain(CoreError::StateConflict { .. }) => ErrorCode::StateConflict,
            LedgerError::Domain(CoreError::Overpayment { .. }) => ErrorCode::Overpayment,
            LedgerError::Domain(CoreError::InsufficientMaterial { .. }) => {
                ErrorCode::InsufficientMaterial
            }
            LedgerError::Storage(DbError::NotFound { .. }) => ErrorCode::NotFound,
            LedgerError::Storage(DbError::UniqueViolation { .. }) => ErrorCode::ValidationError,
            LedgerError::Storage(e) if e.is_retryable() => ErrorCode::Conflict,
            LedgerError::Storage(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Domain(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Storage(DbError::from(err))
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err: LedgerError = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(!err.is_retryable());

        let err: LedgerError = CoreError::conflict("Dispatch", 4, "status is ready").into();
        assert_eq!(err.code(), ErrorCode::StateConflict);
        assert_eq!(err.to_string(), "Dispatch 4 cannot be changed: status is ready");
    }

    #[test]
    fn test_storage_conflict_is_retryable() {
        let err: LedgerError = DbError::stale("ProductBatch", 9).into();
        assert!(err.is_retryable());
        assert_eq!(err.code(), ErrorCode::Conflict);

        let err: LedgerError = DbError::QueryFailed("disk I/O error".to_string()).into();
        assert!(!err.is_retryable());
        assert_eq!(err.code(), ErrorCode::DatabaseError);
    }
}
