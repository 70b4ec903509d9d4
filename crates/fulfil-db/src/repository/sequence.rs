//! # Document Sequence Repository
//!
//! One row per document kind holds the last issued number. It is read and
//! written inside the transaction that inserts the new document, so two
//! writers cannot issue the same number: the loser fails with a conflict
//! and the document tables' UNIQUE columns catch anything else.

use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use fulfil_core::sequence::{next_document_number, DocumentKind};

/// Issues the next number for `kind` on the business date `today`.
pub async fn next_number(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    today: NaiveDate,
) -> DbResult<String> {
    let last: Option<String> =
        sqlx::query_scalar("SELECT last_number FROM document_sequences WHERE kind = ?1")
            .bind(kind.key())
            .fetch_optional(&mut *conn)
            .await?;

    let next = next_document_number(kind, last.as_deref(), today);
    let now = Utc::now();

    match &last {
        Some(previous) => {
            let result = sqlx::query(
                "UPDATE document_sequences SET last_number = ?1, updated_at = ?2
                 WHERE kind = ?3 AND last_number = ?4",
            )
            .bind(&next)
            .bind(now)
            .bind(kind.key())
            .bind(previous)
            .execute(&mut *conn)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::stale("DocumentSequence", kind.key()));
            }
        }
        None => {
            sqlx::query(
                "INSERT INTO document_sequences (kind, last_number, updated_at) VALUES (?1, ?2, ?3)",
            )
            .bind(kind.key())
            .bind(&next)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => DbError::stale("DocumentSequence", kind.key()),
                other => other,
            })?;
        }
    }

    debug!(kind = kind.key(), number = %next, "Issued document number");
    Ok(next)
}

/// Last issued number for `kind`, if any.
pub async fn last_number(conn: &mut SqliteConnection, kind: DocumentKind) -> DbResult<Option<String>> {
    let last = sqlx::query_scalar("SELECT last_number FROM document_sequences WHERE kind = ?1")
        .bind(kind.key())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(last)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_sequence_is_monotonic() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin().await.unwrap();

        for n in 1..=5 {
            let number = next_number(&mut tx, DocumentKind::Invoice, day(2024, 9, 1))
                .await
                .unwrap();
            assert_eq!(number, format!("2024-25/{n}"));
        }
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_kinds_are_independent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin().await.unwrap();

        let today = day(2024, 9, 1);
        next_number(&mut tx, DocumentKind::Invoice, today).await.unwrap();
        next_number(&mut tx, DocumentKind::Invoice, today).await.unwrap();
        let order = next_number(&mut tx, DocumentKind::Order, today).await.unwrap();

        assert_eq!(order, "ORD-2024-25/1");
        assert_eq!(
            last_number(&mut tx, DocumentKind::Invoice).await.unwrap().as_deref(),
            Some("2024-25/2")
        );
    }

    #[tokio::test]
    async fn test_rollback_does_not_consume_number() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let today = day(2025, 1, 10);

        let mut tx = db.begin().await.unwrap();
        next_number(&mut tx, DocumentKind::Production, today).await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let number = next_number(&mut tx, DocumentKind::Production, today).await.unwrap();
        assert_eq!(number, "PROD-2024-25/1");
    }

    #[tokio::test]
    async fn test_fiscal_rollover() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin().await.unwrap();

        next_number(&mut tx, DocumentKind::Invoice, day(2025, 3, 31)).await.unwrap();
        let number = next_number(&mut tx, DocumentKind::Invoice, day(2025, 4, 1))
            .await
            .unwrap();
        assert_eq!(number, "2025-26/1");
    }
}
