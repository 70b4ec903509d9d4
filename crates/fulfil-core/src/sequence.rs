//! # Document Sequences
//!
//! Fiscal-year scoped document numbers.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  FISCAL YEAR: 1 April → 31 March                                        │
//! │                                                                         │
//! │  2024-04-01 … 2025-03-31  →  label "2024-25"                            │
//! │                                                                         │
//! │  Invoice            2024-25/17                                          │
//! │  Sales order        ORD-2024-25/17                                      │
//! │  Production order   PROD-2024-25/17                                     │
//! │  Purchase request   PR-2024-25/17                                       │
//! │                                                                         │
//! │  last = "2024-25/50", today = 2025-04-02  →  "2025-26/1"                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The last issued number lives in a per-kind row that fulfil-db reads and
//! writes inside the transaction inserting the new document.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// =============================================================================
// Document Kind
// =============================================================================

/// The kinds of numbered documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Invoice,
    Order,
    Production,
    PurchaseRequest,
}

impl DocumentKind {
    /// Prefix placed before the fiscal-year label.
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "",
            DocumentKind::Order => "ORD-",
            DocumentKind::Production => "PROD-",
            DocumentKind::PurchaseRequest => "PR-",
        }
    }

    /// Key of the sequence row.
    pub fn key(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoice",
            DocumentKind::Order => "order",
            DocumentKind::Production => "production",
            DocumentKind::PurchaseRequest => "purchase_request",
        }
    }
}

// =============================================================================
// Fiscal Year
// =============================================================================

/// An Indian fiscal year, identified by the calendar year it starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FiscalYear {
    start_year: i32,
}

impl FiscalYear {
    /// Fiscal year containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        let start_year = if date.month() >= 4 {
            date.year()
        } else {
            date.year() - 1
        };
        FiscalYear { start_year }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// `"2024-25"` style label.
    pub fn label(&self) -> String {
        format!("{}-{:02}", self.start_year, (self.start_year + 1).rem_euclid(100))
    }
}

// =============================================================================
// Numbering
// =============================================================================

/// Computes the next document number for `kind`.
///
/// Restarts at 1 when `last` is absent, from another fiscal year, or in any
/// format this function did not produce.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use fulfil_core::sequence::{next_document_number, DocumentKind};
///
/// let today = NaiveDate::from_ymd_opt(2024, 11, 5).unwrap();
/// assert_eq!(
///     next_document_number(DocumentKind::Order, Some("ORD-2024-25/9"), today),
///     "ORD-2024-25/10"
/// );
/// ```
pub fn next_document_number(kind: DocumentKind, last: Option<&str>, today: NaiveDate) -> String {
    let head = format!("{}{}/", kind.prefix(), FiscalYear::from_date(today).label());

    let next = last
        .and_then(|last| last.strip_prefix(head.as_str()))
        .and_then(|tail| tail.parse::<u64>().ok())
        .map_or(1, |n| n + 1);

    format!("{head}{next}")
}

/// Calendar date in the business time zone, given as minutes east of UTC.
pub fn business_date(now: DateTime<Utc>, utc_offset_minutes: i32) -> Result<NaiveDate, ValidationError> {
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
        ValidationError::OutOfRange {
            field: "utc_offset_minutes".to_string(),
            min: -1439,
            max: 1439,
        }
    })?;
    Ok(now.with_timezone(&offset).date_naive())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fiscal_year_boundaries() {
        assert_eq!(FiscalYear::from_date(date(2025, 3, 31)).label(), "2024-25");
        assert_eq!(FiscalYear::from_date(date(2025, 4, 1)).label(), "2025-26");
        assert_eq!(FiscalYear::from_date(date(2099, 6, 1)).label(), "2099-00");
    }

    #[test]
    fn test_first_number_of_year() {
        let today = date(2024, 6, 1);
        assert_eq!(next_document_number(DocumentKind::Invoice, None, today), "2024-25/1");
        assert_eq!(
            next_document_number(DocumentKind::Production, None, today),
            "PROD-2024-25/1"
        );
    }

    #[test]
    fn test_monotonic_within_year() {
        let today = date(2024, 8, 15);
        let mut last: Option<String> = None;
        for expected in 1..=25u64 {
            let next = next_document_number(DocumentKind::Invoice, last.as_deref(), today);
            assert_eq!(next, format!("2024-25/{expected}"));
            last = Some(next);
        }
    }

    #[test]
    fn test_fiscal_rollover_restarts() {
        let next = next_document_number(DocumentKind::Invoice, Some("2024-25/50"), date(2025, 4, 3));
        assert_eq!(next, "2025-26/1");
    }

    #[test]
    fn test_legacy_format_restarts() {
        let today = date(2024, 5, 1);
        assert_eq!(
            next_document_number(DocumentKind::Invoice, Some("INV-00042"), today),
            "2024-25/1"
        );
        assert_eq!(
            next_document_number(DocumentKind::Order, Some("ORD-2024-25/x"), today),
            "ORD-2024-25/1"
        );
    }

    #[test]
    fn test_prefix_must_match() {
        // An invoice-style number does not continue the order sequence.
        let today = date(2024, 5, 1);
        assert_eq!(
            next_document_number(DocumentKind::Order, Some("2024-25/7"), today),
            "ORD-2024-25/1"
        );
    }

    #[test]
    fn test_business_date_uses_offset() {
        // 20:00 UTC on 31 March is already 1 April in IST.
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 20, 0, 0).unwrap();
        assert_eq!(business_date(now, 330).unwrap(), date(2025, 4, 1));
        assert_eq!(business_date(now, 0).unwrap(), date(2025, 3, 31));
        assert!(business_date(now, 24 * 60).is_err());
    }
}
