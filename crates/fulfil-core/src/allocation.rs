//! # FIFO Batch Allocation
//!
//! Plans which production batches satisfy a dispatch line.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request: product P, 8 units                                            │
//! │                                                                         │
//! │  B1  2024-01-01  remaining 5   ──► take 5  ──► remaining 0 (depleted)   │
//! │  B2  2024-01-03  remaining 10  ──► take 3  ──► remaining 7              │
//! │  B3  2024-01-09  remaining 4       untouched                            │
//! │                                                                         │
//! │  oldest production_date first, ties broken by batch id                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The plan is pure. fulfil-db applies it with guarded decrements so a
//! stale plan can never drive a batch below zero.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A batch as seen by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchStock {
    pub batch_id: i64,
    pub production_date: NaiveDate,
    pub quantity_remaining: i64,
}

/// Units taken from one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchAllocation {
    pub batch_id: i64,
    pub quantity: i64,
}

/// Outcome of planning one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationPlan {
    /// The product has no batches at all; stock is not batch-tracked.
    Untracked,

    /// Greedy FIFO allocation. `shortfall` is zero when fully satisfied.
    Allocated {
        allocations: Vec<BatchAllocation>,
        shortfall: i64,
    },
}

impl AllocationPlan {
    pub fn allocations(&self) -> &[BatchAllocation] {
        match self {
            AllocationPlan::Untracked => &[],
            AllocationPlan::Allocated { allocations, .. } => allocations,
        }
    }

    pub fn shortfall(&self) -> i64 {
        match self {
            AllocationPlan::Untracked => 0,
            AllocationPlan::Allocated { shortfall, .. } => *shortfall,
        }
    }

    /// Units actually allocated.
    pub fn allocated(&self) -> i64 {
        self.allocations().iter().map(|a| a.quantity).sum()
    }
}

/// A line that could not be fully allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub product_id: i64,
    pub requested: i64,
    pub allocated: i64,
}

impl Shortfall {
    pub fn missing(&self) -> i64 {
        self.requested - self.allocated
    }
}

/// Plans a FIFO allocation of `quantity` units.
///
/// `batches` is every batch of the product, in any order, including
/// depleted ones: an empty slice means the product is untracked, while a
/// slice of only depleted batches yields a full shortfall.
pub fn plan_fifo(batches: &[BatchStock], quantity: i64) -> AllocationPlan {
    if batches.is_empty() {
        return AllocationPlan::Untracked;
    }

    let mut candidates: Vec<&BatchStock> = batches
        .iter()
        .filter(|b| b.quantity_remaining > 0)
        .collect();
    candidates.sort_by_key(|b| (b.production_date, b.batch_id));

    let mut needed = quantity;
    let mut allocations = Vec::new();

    for batch in candidates {
        if needed == 0 {
            break;
        }
        let take = needed.min(batch.quantity_remaining);
        allocations.push(BatchAllocation {
            batch_id: batch.batch_id,
            quantity: take,
        });
        needed -= take;
    }

    AllocationPlan::Allocated {
        allocations,
        shortfall: needed,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
